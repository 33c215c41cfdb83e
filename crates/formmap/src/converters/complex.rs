use log::trace;

use crate::{
    FormDataConverter, FormDataMapperOptions, FormDataReader, FormValue, MappingErrorKind,
    MappingFault, ReadOutcome,
};

#[derive(Debug, Clone, Copy)]
struct MemberOutcome {
    found: bool,
    succeeded: bool,
}

type MemberRead<T> = dyn Fn(&mut T, &mut FormDataReader<'_>, &FormDataMapperOptions) -> Result<MemberOutcome, MappingFault>
    + Send
    + Sync;

fn member_step<T, F>(read: F) -> F
where
    F: Fn(&mut T, &mut FormDataReader<'_>, &FormDataMapperOptions) -> Result<MemberOutcome, MappingFault>,
{
    read
}

struct MemberStep<T> {
    name: &'static str,
    read: Box<MemberRead<T>>,
}

/// The precompiled decode plan of a struct: how to create it and, for every
/// bound member, which prefix segment to read and where to store the value.
///
/// Plans are built once per type and options and then run for every
/// submission. Member converters are looked up in the options' converter
/// cache when the plan runs, which lets a type contain itself (through
/// `Option<Box<_>>` or a collection) without recursing at build time.
///
/// Most types use [`form_object!`](crate::form_object) instead of building a
/// plan by hand.
///
/// ```rust
/// use formmap::converters::{ComplexTypeConverter, ComplexTypePlan};
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let plan = ComplexTypePlan::builder(Point::default)
///     .member("X", |p: &mut Point, x: i32| p.x = x)
///     .member("Y", |p: &mut Point, y: i32| p.y = y)
///     .build();
/// assert_eq!(plan.member_names().collect::<Vec<_>>(), ["X", "Y"]);
/// let converter = ComplexTypeConverter::new(plan);
/// # let _ = converter;
/// ```
pub struct ComplexTypePlan<T> {
    create: fn() -> T,
    members: Vec<MemberStep<T>>,
}

impl<T: 'static> ComplexTypePlan<T> {
    /// Starts a plan whose objects are created by `create`.
    pub fn builder(create: fn() -> T) -> ComplexTypePlanBuilder<T> {
        ComplexTypePlanBuilder {
            create,
            members: Vec::new(),
        }
    }
}

impl<T> ComplexTypePlan<T> {
    /// The bound member names, in decode order.
    pub fn member_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|member| member.name)
    }

    fn run(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<(T, bool), MappingFault> {
        let mut target = (self.create)();
        let mut succeeded = true;
        for member in &self.members {
            let outcome = (member.read)(&mut target, reader, options)?;
            trace!(
                "member '{}' at '{}': found={} succeeded={}",
                member.name,
                reader.prefix(),
                outcome.found,
                outcome.succeeded
            );
            succeeded &= outcome.succeeded;
        }
        Ok((target, succeeded))
    }
}

/// Collects the member steps of a [`ComplexTypePlan`].
pub struct ComplexTypePlanBuilder<T> {
    create: fn() -> T,
    members: Vec<MemberStep<T>>,
}

impl<T: 'static> ComplexTypePlanBuilder<T> {
    /// Binds the member `name` of type `M`. `assign` stores a decoded value;
    /// it is not called when nothing was submitted for the member, so the
    /// value from the constructor stays in place.
    #[must_use]
    pub fn member<M, F>(mut self, name: &'static str, assign: F) -> Self
    where
        M: FormValue,
        F: Fn(&mut T, M) + Send + Sync + 'static,
    {
        let read = member_step(move |target: &mut T, reader, options| {
            // Looked up per run: a step holding the converter would keep a
            // self-referential type's converter alive through the cache.
            let converter = options.resolve_converter::<M>();
            let outcome = reader.with_prefix(name, |reader| converter.try_read(reader, options))?;
            if let Some(value) = outcome.value.filter(|_| outcome.found) {
                assign(target, value);
            }
            Ok(MemberOutcome {
                found: outcome.found,
                succeeded: outcome.succeeded,
            })
        });

        self.members.push(MemberStep {
            name,
            read: Box::new(read),
        });
        self
    }

    /// Finishes the plan.
    #[must_use]
    pub fn build(self) -> ComplexTypePlan<T> {
        ComplexTypePlan {
            create: self.create,
            members: self.members,
        }
    }
}

/// Runs a [`ComplexTypePlan`] at the current prefix.
///
/// The object is found when any submitted key lies under the prefix. Member
/// failures leave the partially bound object in place and mark the read as
/// failed; faults raised below are recorded as errors at this prefix and
/// yield no object.
pub struct ComplexTypeConverter<T> {
    plan: ComplexTypePlan<T>,
}

impl<T> ComplexTypeConverter<T> {
    /// Wraps `plan`.
    pub fn new(plan: ComplexTypePlan<T>) -> Self {
        Self { plan }
    }
}

impl<T> FormDataConverter<T> for ComplexTypeConverter<T> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault> {
        if !reader.current_prefix_exists() {
            return Ok(ReadOutcome::absent());
        }
        trace!(
            "reading {} at '{}'",
            core::any::type_name::<T>(),
            reader.prefix()
        );

        match self.plan.run(reader, options) {
            Ok((value, true)) => Ok(ReadOutcome::success(value)),
            Ok((value, false)) => {
                reader.attach_instance_to_errors::<T>();
                Ok(ReadOutcome::failure(Some(value)))
            }
            Err(fault) => {
                reader.add_mapping_error(MappingErrorKind::Fault(fault), None);
                Ok(ReadOutcome::failure(None))
            }
        }
    }
}

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{FormDataConverter, FormValue};

type ConverterCache = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Limits and converters shared by decode passes.
///
/// An options value is safe to share between threads. Converters are created
/// on first use and cached, so keep one options value around rather than
/// building a new one per submission.
///
/// # Examples
///
/// ```rust
/// use formmap::FormDataMapperOptions;
///
/// let mut options = FormDataMapperOptions::default();
/// options.max_collection_size = 500;
/// ```
pub struct FormDataMapperOptions {
    /// Maximum number of elements bound into a single collection, and of
    /// entries bound into a single dictionary.
    ///
    /// When a submission holds more, the first `max_collection_size` are kept
    /// and one error is recorded for the collection.
    ///
    /// # Default
    ///
    /// `100`
    pub max_collection_size: usize,

    /// Maximum number of prefix segments pushed at once. Guards against
    /// unbounded recursion through self-referential types.
    ///
    /// # Default
    ///
    /// `64`
    pub max_recursion_depth: usize,

    /// Maximum number of errors stored on the reader during one decode.
    ///
    /// # Default
    ///
    /// `200`
    pub max_error_count: usize,

    pub(crate) converters: RwLock<ConverterCache>,
}

impl FormDataMapperOptions {
    /// Options with the default limits and no registered converters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `converter` for `T`, replacing the default one.
    pub fn add_converter<T: 'static>(&mut self, converter: impl FormDataConverter<T> + 'static) {
        let converter: Arc<dyn FormDataConverter<T>> = Arc::new(converter);
        self.converters
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(converter));
    }

    /// The converter for `T`: a registered one, else a cached default, else a
    /// freshly created default which is then cached.
    pub fn resolve_converter<T: FormValue>(&self) -> Arc<dyn FormDataConverter<T>> {
        if let Some(converter) = self.cached_converter::<T>() {
            return converter;
        }

        // Created without holding the lock: container converters resolve
        // their element converters through `self`.
        let created = T::create_converter(self);
        let entry: Arc<dyn Any + Send + Sync> = Arc::new(created.clone());
        let mut cache = self
            .converters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(TypeId::of::<T>())
            .or_insert(entry)
            .downcast_ref::<Arc<dyn FormDataConverter<T>>>()
            .cloned()
            .unwrap_or(created)
    }

    fn cached_converter<T: 'static>(&self) -> Option<Arc<dyn FormDataConverter<T>>> {
        let cache = self
            .converters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .get(&TypeId::of::<T>())?
            .downcast_ref::<Arc<dyn FormDataConverter<T>>>()
            .cloned()
    }
}

impl Default for FormDataMapperOptions {
    fn default() -> Self {
        Self {
            max_collection_size: 100,
            max_recursion_depth: 64,
            max_error_count: 200,
            converters: RwLock::default(),
        }
    }
}

impl fmt::Debug for FormDataMapperOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormDataMapperOptions")
            .field("max_collection_size", &self.max_collection_size)
            .field("max_recursion_depth", &self.max_recursion_depth)
            .field("max_error_count", &self.max_error_count)
            .finish_non_exhaustive()
    }
}

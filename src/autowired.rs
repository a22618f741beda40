//! Write-once slot for property-injected references.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::BoxError;

/// A reference filled once after construction, typically by an autowired
/// property setter.
///
/// Setters receive `&T`, so beans hold late-bound dependencies in an
/// `Autowired` field. This is also what makes singleton property cycles
/// possible: each side is constructed first and wired afterwards.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Autowired, BeanClass, BeanCollection, BeanDefinition, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Left { right: Autowired<Right> }
/// #[derive(Default)]
/// struct Right { left: Autowired<Left> }
///
/// let left = BeanClass::builder::<Left>()
///     .default_constructor(Left::default)
///     .autowired::<Right, _>("right", |l, r| l.right.set(r))
///     .build();
/// let right = BeanClass::builder::<Right>()
///     .default_constructor(Right::default)
///     .autowired::<Left, _>("left", |r, l| r.left.set(l))
///     .build();
///
/// let mut beans = BeanCollection::new();
/// beans.register_definition("left", BeanDefinition::of(left));
/// beans.register_definition("right", BeanDefinition::of(right));
/// let factory = beans.build().unwrap();
///
/// let l = factory.get::<Left>().unwrap();
/// let r = factory.get::<Right>().unwrap();
/// assert!(Arc::ptr_eq(&l.right.get(), &r));
/// assert!(Arc::ptr_eq(&r.left.get(), &l));
/// ```
pub struct Autowired<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Autowired<T> {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Fills the slot; a second call fails.
    pub fn set(&self, value: Arc<T>) -> Result<(), BoxError> {
        self.cell
            .set(value)
            .map_err(|_| format!("{} is already injected", std::any::type_name::<T>()).into())
    }

    /// The injected reference, `None` before injection.
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// The injected reference.
    ///
    /// # Panics
    ///
    /// Panics if nothing was injected yet.
    pub fn get(&self) -> Arc<T> {
        match self.cell.get() {
            Some(value) => value.clone(),
            None => panic!("{} was not injected", std::any::type_name::<T>()),
        }
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized> Default for Autowired<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Autowired<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowired")
            .field("type", &std::any::type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}

//! Capability registry.
//!
//! Plugins extend a live object, typically a
//! [`NetworkContext`](super::context::NetworkContext), with named attributes
//! and methods at runtime. The registry rejects collisions instead of
//! silently overwriting:
//!
//! - a name declared by the owning type can never be added;
//! - a name can be added once and must be removed before it is added again;
//! - only added names can be replaced or removed.
//!
//! ```rust,ignore
//! use tern_core::Extensible;
//!
//! ctx.add_method("greet", |ctx: &NetworkContext, nick: String| {
//!     ctx.send_msg(&nick, "hello")
//! })?;
//!
//! let sent: ContextResult<()> = ctx.call_method("greet", "alice".to_owned())?;
//! ```
//!
//! Typed extension traits wrap these calls so call sites are checked at
//! compile time (see `CtcpExt` in the plugins crate).

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{CapabilityError, CapabilityResult};

/// A type-erased capability value.
pub type CapabilityValue = Arc<dyn Any + Send + Sync>;

/// A method bound to owners of type `O`, taking `A` and returning `R`.
pub type Method<O, A, R> = Arc<dyn Fn(&O, A) -> R + Send + Sync>;

/// Stored form of a method, so it can be told apart from plain values.
struct BoundMethod<O, A, R>(Method<O, A, R>);

// =============================================================================
// Capability Table
// =============================================================================

/// Name to value table owned by an [`Extensible`] object.
///
/// The table is extended and shrunk in place, never replaced.
#[derive(Default)]
pub struct Capabilities {
    table: RwLock<HashMap<String, CapabilityValue>>,
}

impl Capabilities {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the added names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.table.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn get(&self, name: &str) -> Option<CapabilityValue> {
        self.table.read().get(name).cloned()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// =============================================================================
// Extensible
// =============================================================================

/// An object whose attributes can be extended at runtime.
///
/// Implementors list their own attribute and method names in
/// [`DECLARED`](Self::DECLARED); those names can never be added, and
/// lookups resolve them before consulting the table.
pub trait Extensible: Send + Sync + Sized + 'static {
    /// Names of the type's own attributes and methods.
    const DECLARED: &'static [&'static str];

    /// Identity of the object, used in errors.
    fn identity(&self) -> String;

    /// The object's capability table.
    fn capabilities(&self) -> &Capabilities;

    /// Value of a declared attribute exposed through the registry.
    ///
    /// Declared names without a value here are built-in methods.
    fn declared_attribute(&self, _name: &str) -> Option<CapabilityValue> {
        None
    }

    /// Adds a new attribute.
    fn add_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) -> CapabilityResult<()> {
        self.add_value(name, Arc::new(value))
    }

    /// Adds a type-erased value under `name`.
    fn add_value(&self, name: &str, value: CapabilityValue) -> CapabilityResult<()> {
        let conflict = || CapabilityError::Conflict {
            owner: self.identity(),
            name: name.to_owned(),
        };
        if Self::DECLARED.contains(&name) {
            return Err(conflict());
        }

        let mut table = self.capabilities().table.write();
        if table.contains_key(name) {
            return Err(conflict());
        }
        debug!(owner = %self.identity(), name, "Adding attribute");
        table.insert(name.to_owned(), value);
        Ok(())
    }

    /// Adds a method; `call_method` supplies the owner as first argument.
    fn add_method<A, R, F>(&self, name: &str, method: F) -> CapabilityResult<()>
    where
        A: 'static,
        R: 'static,
        F: Fn(&Self, A) -> R + Send + Sync + 'static,
    {
        let method: Method<Self, A, R> = Arc::new(method);
        self.add_attribute(name, BoundMethod(method))
    }

    /// Replaces the value of an added attribute.
    fn set_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) -> CapabilityResult<()> {
        let mut table = self.capabilities().table.write();
        match table.get_mut(name) {
            Some(slot) => {
                *slot = Arc::new(value);
                Ok(())
            }
            None => Err(CapabilityError::NotAdded {
                owner: self.identity(),
                name: name.to_owned(),
            }),
        }
    }

    /// Removes an added attribute or method.
    fn remove_attribute(&self, name: &str) -> CapabilityResult<()> {
        let removed = self.capabilities().table.write().remove(name);
        match removed {
            Some(_) => {
                debug!(owner = %self.identity(), name, "Removed attribute");
                Ok(())
            }
            None => Err(CapabilityError::NotAdded {
                owner: self.identity(),
                name: name.to_owned(),
            }),
        }
    }

    /// Returns `true` if `name` resolves to a declared or added attribute.
    fn has_attribute(&self, name: &str) -> bool {
        Self::DECLARED.contains(&name) || self.capabilities().get(name).is_some()
    }

    /// Looks up an attribute as a `T`.
    ///
    /// Declared attributes are resolved first; declared methods fail with
    /// [`CapabilityError::Builtin`].
    fn attribute<T: Any + Send + Sync>(&self, name: &str) -> CapabilityResult<Arc<T>> {
        self.lookup(name)?
            .downcast::<T>()
            .map_err(|_| CapabilityError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Calls an added method with the owner bound as first argument.
    fn call_method<A: 'static, R: 'static>(&self, name: &str, args: A) -> CapabilityResult<R> {
        let value = self.lookup(name)?;
        let method = value
            .downcast_ref::<BoundMethod<Self, A, R>>()
            .ok_or_else(|| CapabilityError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<Method<Self, A, R>>(),
            })?;
        Ok((method.0)(self, args))
    }

    #[doc(hidden)]
    fn lookup(&self, name: &str) -> CapabilityResult<CapabilityValue> {
        if Self::DECLARED.contains(&name) {
            return self
                .declared_attribute(name)
                .ok_or_else(|| CapabilityError::Builtin {
                    owner: self.identity(),
                    name: name.to_owned(),
                });
        }
        self.capabilities()
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound {
                owner: self.identity(),
                name: name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        label: String,
        capabilities: Capabilities,
    }

    impl Widget {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_owned(),
                capabilities: Capabilities::new(),
            }
        }
    }

    impl Extensible for Widget {
        const DECLARED: &'static [&'static str] = &["label", "render"];

        fn identity(&self) -> String {
            format!("Widget({})", self.label)
        }

        fn capabilities(&self) -> &Capabilities {
            &self.capabilities
        }

        fn declared_attribute(&self, name: &str) -> Option<CapabilityValue> {
            (name == "label").then(|| Arc::new(self.label.clone()) as CapabilityValue)
        }
    }

    #[test]
    fn test_add_remove_add() {
        let widget = Widget::new("w");
        let greet = |w: &Widget, who: &'static str| format!("{} greets {who}", w.label);

        widget.add_method("greet", greet).unwrap();
        let err = widget.add_method("greet", greet).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::Conflict {
                owner: "Widget(w)".into(),
                name: "greet".into(),
            }
        );

        widget.remove_attribute("greet").unwrap();
        widget.add_method("greet", greet).unwrap();

        let greeting: String = widget.call_method("greet", "you").unwrap();
        assert_eq!(greeting, "w greets you");
    }

    #[test]
    fn test_declared_names_are_reserved() {
        let widget = Widget::new("w");

        assert!(matches!(
            widget.add_attribute("label", 1u8),
            Err(CapabilityError::Conflict { .. })
        ));
        assert_eq!(*widget.attribute::<String>("label").unwrap(), "w");
        assert!(matches!(
            widget.attribute::<String>("render"),
            Err(CapabilityError::Builtin { .. })
        ));
        assert!(widget.has_attribute("render"));
    }

    #[test]
    fn test_set_and_remove_require_add() {
        let widget = Widget::new("w");

        assert!(matches!(
            widget.set_attribute("color", "red"),
            Err(CapabilityError::NotAdded { .. })
        ));
        assert!(matches!(
            widget.remove_attribute("color"),
            Err(CapabilityError::NotAdded { .. })
        ));

        widget.add_attribute("color", "red").unwrap();
        widget.set_attribute("color", "blue").unwrap();
        assert_eq!(*widget.attribute::<&'static str>("color").unwrap(), "blue");
        assert_eq!(widget.capabilities().names(), ["color"]);
    }

    #[test]
    fn test_lookup_errors() {
        let widget = Widget::new("w");
        widget.add_attribute("size", 3u32).unwrap();

        assert_eq!(
            widget.attribute::<u32>("missing").unwrap_err(),
            CapabilityError::NotFound {
                owner: "Widget(w)".into(),
                name: "missing".into(),
            }
        );
        assert!(matches!(
            widget.attribute::<String>("size"),
            Err(CapabilityError::TypeMismatch { .. })
        ));
        assert!(matches!(
            widget.call_method::<(), ()>("size", ()),
            Err(CapabilityError::TypeMismatch { .. })
        ));
    }
}

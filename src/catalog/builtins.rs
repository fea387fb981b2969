//! Types provided by the hosting PHP runtime.
//!
//! These are always resolvable so rules can name them (`implement("Countable")`),
//! but they are marked internal and never selected.

use super::{TypeDescriptor, TypeKind};

/// (name, kind, parent, interfaces, final)
type BuiltinSpec = (
    &'static str,
    TypeKind,
    Option<&'static str>,
    &'static [&'static str],
    bool,
);

const BUILTINS: &[BuiltinSpec] = &[
    // Core interfaces
    ("Traversable", TypeKind::Interface, None, &[], false),
    ("Iterator", TypeKind::Interface, None, &["Traversable"], false),
    ("IteratorAggregate", TypeKind::Interface, None, &["Traversable"], false),
    ("ArrayAccess", TypeKind::Interface, None, &[], false),
    ("Countable", TypeKind::Interface, None, &[], false),
    ("Serializable", TypeKind::Interface, None, &[], false),
    ("Stringable", TypeKind::Interface, None, &[], false),
    ("JsonSerializable", TypeKind::Interface, None, &[], false),
    ("Throwable", TypeKind::Interface, None, &["Stringable"], false),
    ("UnitEnum", TypeKind::Interface, None, &[], false),
    ("BackedEnum", TypeKind::Interface, None, &["UnitEnum"], false),
    ("DateTimeInterface", TypeKind::Interface, None, &[], false),
    // Core classes
    ("stdClass", TypeKind::Class, None, &[], false),
    ("Closure", TypeKind::Class, None, &[], true),
    ("Generator", TypeKind::Class, None, &["Iterator"], true),
    ("ArrayObject", TypeKind::Class, None, &["IteratorAggregate", "ArrayAccess", "Serializable", "Countable"], false),
    ("ArrayIterator", TypeKind::Class, None, &["Iterator", "ArrayAccess", "Serializable", "Countable"], false),
    ("DateTime", TypeKind::Class, None, &["DateTimeInterface"], false),
    ("DateTimeImmutable", TypeKind::Class, None, &["DateTimeInterface"], false),
    // Errors
    ("Exception", TypeKind::Class, None, &["Throwable"], false),
    ("Error", TypeKind::Class, None, &["Throwable"], false),
    ("ErrorException", TypeKind::Class, Some("Exception"), &[], false),
    ("TypeError", TypeKind::Class, Some("Error"), &[], false),
    ("ValueError", TypeKind::Class, Some("Error"), &[], false),
    ("ArithmeticError", TypeKind::Class, Some("Error"), &[], false),
    ("DivisionByZeroError", TypeKind::Class, Some("ArithmeticError"), &[], false),
    // SPL exceptions
    ("LogicException", TypeKind::Class, Some("Exception"), &[], false),
    ("BadFunctionCallException", TypeKind::Class, Some("LogicException"), &[], false),
    ("BadMethodCallException", TypeKind::Class, Some("BadFunctionCallException"), &[], false),
    ("DomainException", TypeKind::Class, Some("LogicException"), &[], false),
    ("InvalidArgumentException", TypeKind::Class, Some("LogicException"), &[], false),
    ("LengthException", TypeKind::Class, Some("LogicException"), &[], false),
    ("OutOfRangeException", TypeKind::Class, Some("LogicException"), &[], false),
    ("RuntimeException", TypeKind::Class, Some("Exception"), &[], false),
    ("OutOfBoundsException", TypeKind::Class, Some("RuntimeException"), &[], false),
    ("OverflowException", TypeKind::Class, Some("RuntimeException"), &[], false),
    ("RangeException", TypeKind::Class, Some("RuntimeException"), &[], false),
    ("UnderflowException", TypeKind::Class, Some("RuntimeException"), &[], false),
    ("UnexpectedValueException", TypeKind::Class, Some("RuntimeException"), &[], false),
];

lazy_static::lazy_static! {
    /// Runtime-provided types, in declaration order.
    pub static ref BUILTIN_TYPES: Vec<TypeDescriptor> = BUILTINS
        .iter()
        .map(|&(name, kind, parent, interfaces, is_final)| {
            let mut ty = TypeDescriptor::new(kind, name);
            ty.is_internal = true;
            ty.is_final = is_final;
            ty.parent = parent.map(str::to_string);
            for interface in interfaces {
                ty.add_interface(interface.to_string());
            }
            ty
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_internal() {
        assert!(BUILTIN_TYPES.iter().all(|t| t.is_internal));
        let closure = BUILTIN_TYPES.iter().find(|t| t.name == "Closure").unwrap();
        assert!(closure.is_final);
        assert!(closure.declaring_file.is_none());
    }

    #[test]
    fn test_builtin_parents_are_builtins() {
        for ty in BUILTIN_TYPES.iter() {
            for supertype in ty.parent.iter().chain(ty.interfaces.iter()) {
                assert!(
                    BUILTIN_TYPES.iter().any(|t| &t.name == supertype),
                    "{} refers to unknown {}",
                    ty.name,
                    supertype
                );
            }
        }
    }
}

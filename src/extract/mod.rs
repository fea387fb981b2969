//! Type extraction from PHP source without a compiler front end.
//!
//! Extraction runs in two stages:
//!
//! ```text
//! source ──▶ lexer::tokenize ──▶ [Token] ──▶ Scanner ──▶ FileTypes
//! ```
//!
//! The lexer separates literals and comments from code, so keywords inside
//! strings, comments or heredocs never look like declarations. The scanner
//! walks the significant tokens once and reports top-level `class`,
//! `interface` and `trait` declarations with their modifiers, supertypes and
//! method signatures.

mod lexer;
mod scanner;

use std::path::Path;

use crate::catalog::{TypeDescriptor, TypeKind};

pub use lexer::{tokenize, Token, TokenKind};

/// Errors raised while tokenizing a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("unterminated {what} starting at line {line}")]
    Unterminated { what: &'static str, line: usize },
}

/// Declarations found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypes {
    /// Namespace enclosing the first declaration (empty for the global namespace).
    pub namespace: String,
    /// Declarations in source order.
    pub types: Vec<TypeDescriptor>,
}

impl FileTypes {
    /// `(kind, short name)` pairs in source order.
    pub fn declarations(&self) -> impl Iterator<Item = (TypeKind, &str)> {
        self.types.iter().map(|t| (t.kind, t.short_name()))
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Extract every top-level declaration in `source`.
pub fn extract_all(file: &Path, source: &str) -> Result<FileTypes, ExtractError> {
    let tokens = tokenize(source)?;
    Ok(scanner::Scanner::new(file).run(&tokens, None))
}

/// Extract only the first top-level declaration in `source`.
///
/// Scanning stops as soon as the first type body closes.
pub fn extract_first(file: &Path, source: &str) -> Result<Option<TypeDescriptor>, ExtractError> {
    let tokens = tokenize(source)?;
    let found = scanner::Scanner::new(file).run(&tokens, Some(1));
    Ok(found.types.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Visibility;

    fn all(source: &str) -> FileTypes {
        extract_all(Path::new("Test.php"), source).unwrap()
    }

    #[test]
    fn test_namespaced_class_with_supertypes() {
        let found = all(r#"<?php
namespace App\Service;

use App\Contracts\Bar;
use Psr\Log\LoggerInterface as Logger;

final class Foo extends Base implements Bar, Logger, \Countable
{
    public function __construct(private Logger $logger) {}

    public function handle(): void
    {
        if (true) { $x = new class { public function hidden() {} }; }
    }

    protected function helper() {}
    private static function build() {}
    function legacy() {}
}
"#);

        assert_eq!(found.namespace, "App\\Service");
        assert_eq!(found.types.len(), 1);

        let foo = &found.types[0];
        assert_eq!(foo.name, "App\\Service\\Foo");
        assert_eq!(foo.kind, TypeKind::Class);
        assert!(foo.is_final);
        assert!(!foo.is_abstract);
        assert_eq!(foo.parent.as_deref(), Some("App\\Service\\Base"));
        assert_eq!(
            foo.interfaces,
            vec![
                "App\\Contracts\\Bar".to_string(),
                "Psr\\Log\\LoggerInterface".to_string(),
                "Countable".to_string(),
            ]
        );

        let names: Vec<_> = foo.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__construct", "handle", "helper", "build", "legacy"]);
        assert!(foo.methods[0].is_constructor);
        assert_eq!(foo.methods[2].visibility, Visibility::Protected);
        assert!(foo.methods[3].is_static);
        assert_eq!(foo.methods[4].visibility, Visibility::Public);
        assert_eq!(foo.public_method_count(), 2);
        assert_eq!(foo.declaring_file.as_deref(), Some(Path::new("Test.php")));
    }

    #[test]
    fn test_multiple_declarations_in_order() {
        let found = all(r#"<?php
interface Shape extends Countable, Stringable { public function area(): float; }
abstract class Base {}
trait Greets { public function hello() {} }
class Square extends Base implements Shape {}
"#);

        let decls: Vec<_> = found.declarations().collect();
        assert_eq!(
            decls,
            vec![
                (TypeKind::Interface, "Shape"),
                (TypeKind::Class, "Base"),
                (TypeKind::Trait, "Greets"),
                (TypeKind::Class, "Square"),
            ]
        );
        assert_eq!(found.namespace, "");

        let shape = &found.types[0];
        assert!(shape.parent.is_none());
        assert_eq!(shape.interfaces, vec!["Countable", "Stringable"]);
        assert!(shape.methods[0].is_abstract);
        assert!(found.types[1].is_abstract);
    }

    #[test]
    fn test_extract_first_stops_after_first_declaration() {
        let first = extract_first(
            Path::new("Two.php"),
            "<?php class One { public function a() {} } class Two {}",
        )
        .unwrap()
        .unwrap();
        assert_eq!(first.name, "One");
        assert_eq!(first.methods.len(), 1);
    }

    #[test]
    fn test_no_declarations() {
        let found = all("<?php\n$x = Foo::class;\n$y = $obj->class;\nfunction f() { class Inner {} }\n");
        assert!(found.is_empty());
        assert_eq!(found.namespace, "");
        assert!(extract_first(Path::new("f.php"), "<?php echo 1;").unwrap().is_none());
    }

    #[test]
    fn test_declarations_in_literals_are_ignored() {
        let found = all(r#"<?php
// class InComment {}
$s = "class InString {}";
/** interface InDoc {} */
class Real {}
"#);
        let decls: Vec<_> = found.declarations().map(|(_, n)| n.to_string()).collect();
        assert_eq!(decls, vec!["Real"]);
    }

    #[test]
    fn test_braced_namespaces() {
        let found = all(r#"<?php
namespace App\A {
    class First {}
}
namespace App\B {
    use App\A\First;
    class Second extends First {}
}
namespace {
    class Global {}
}
"#);
        let names: Vec<_> = found.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["App\\A\\First", "App\\B\\Second", "Global"]);
        assert_eq!(found.types[1].parent.as_deref(), Some("App\\A\\First"));
        assert_eq!(found.namespace, "App\\A");
    }

    #[test]
    fn test_group_use_and_relative_names() {
        let found = all(r#"<?php
namespace App;

use App\Contracts\{Handler, Queue as Q};
use function App\helper;

class Job implements Handler, Q, namespace\Local, Sub\Thing {}
"#);
        let job = &found.types[0];
        assert_eq!(
            job.interfaces,
            vec![
                "App\\Contracts\\Handler",
                "App\\Contracts\\Queue",
                "App\\Local",
                "App\\Sub\\Thing",
            ]
        );
    }

    #[test]
    fn test_modifiers_only_apply_to_classes() {
        let found = all("<?php #[Attr] abstract class A {} final class B {} readonly final class C {}");
        assert!(found.types[0].is_abstract);
        assert!(found.types[1].is_final);
        assert!(found.types[2].is_final);
        assert!(!found.types[2].is_abstract);
    }

    #[test]
    fn test_anonymous_class_and_enum_are_ignored() {
        let found = all(r#"<?php
$a = new class extends Base {};
enum Suit: string { case Hearts = 'H'; }
class After {}
"#);
        let decls: Vec<_> = found.declarations().map(|(_, n)| n.to_string()).collect();
        assert_eq!(decls, vec!["After"]);
    }

    #[test]
    fn test_unterminated_comment_is_an_error() {
        let err = extract_all(Path::new("bad.php"), "<?php class A {} /* open").unwrap_err();
        assert_eq!(err.to_string(), "unterminated comment starting at line 1");
    }
}

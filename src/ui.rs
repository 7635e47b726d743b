use colored::Colorize;
use oid::{Oid, PREFIX, SEPARATOR};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Reference rendered with its type tag highlighted
pub fn reference(oid: &Oid) -> String {
    let mut out = format!(
        "{PREFIX}{SEPARATOR}{}{SEPARATOR}{}",
        oid.kind().tag().cyan(),
        oid.id()
    );
    if let Some(second) = oid.version().or(oid.scope()) {
        out.push(SEPARATOR);
        out.push_str(&second.dimmed().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_keeps_text() {
        colored::control::set_override(false);
        let oid = Oid::dataset("42", Some("7")).unwrap();
        assert_eq!(reference(&oid), "o:dataset:42:7");
        let oid = Oid::folder("9", "41").unwrap();
        assert_eq!(reference(&oid), "o:folder:9:41");
    }
}

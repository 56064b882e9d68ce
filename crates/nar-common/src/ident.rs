//! Helpers for the identifier forms used across the compiler.
//!
//! A *qualified* identifier names a module (`Nar.Base.List`), a *full*
//! identifier names a definition inside a module (`Nar.Base.List.map`),
//! and a data option identifier names one option of a data type
//! (`Nar.Base.Maybe.Maybe#Just`).

/// Join a module name and a definition name into a full identifier.
pub fn full_identifier(module: &str, name: &str) -> String {
    format!("{module}.{name}")
}

/// Join a data type's full name and one of its option names.
pub fn data_option_identifier(data: &str, option: &str) -> String {
    format!("{data}#{option}")
}

/// The trailing component of a full or data option identifier.
pub fn short_name(identifier: &str) -> &str {
    match identifier.rfind(['.', '#']) {
        Some(idx) => &identifier[idx + 1..],
        None => identifier,
    }
}

/// Strip `module.` from the front of `identifier` when it belongs to `module`.
pub fn relative_to<'a>(identifier: &'a str, module: &str) -> &'a str {
    identifier
        .strip_prefix(module)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_identifiers() {
        assert_eq!(full_identifier("Nar.Base.List", "map"), "Nar.Base.List.map");
        assert_eq!(
            data_option_identifier("Nar.Base.Maybe.Maybe", "Just"),
            "Nar.Base.Maybe.Maybe#Just"
        );
    }

    #[test]
    fn short_names() {
        assert_eq!(short_name("Nar.Base.Maybe.Maybe#Just"), "Just");
        assert_eq!(short_name("Nar.Base.Math.Int"), "Int");
        assert_eq!(short_name("local"), "local");
    }

    #[test]
    fn relative_names() {
        assert_eq!(relative_to("Main.Shape", "Main"), "Shape");
        assert_eq!(relative_to("Mainline.Shape", "Main"), "Mainline.Shape");
        assert_eq!(relative_to("Nar.Base.Math.Int", "Main"), "Nar.Base.Math.Int");
    }
}

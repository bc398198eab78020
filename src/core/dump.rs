//! Pretty rendering of recorded arguments and return values.

use std::fmt::Debug;

/// Indentation placed before every dump line.
pub const DUMP_INDENT: &str = "\t";

/// Render a value with the alternate (`{:#?}`) Debug format: compound values
/// span several lines, atoms stay inline.
pub fn render<T: Debug + ?Sized>(value: &T) -> String {
    format!("{:#?}", value)
}

/// Returns `true` when a value of type `T` rendered as `rendered` carries
/// nothing to report: the unit value, or `None` of an `Option`. Other types
/// whose Debug output happens to read `None` are reported as usual.
pub fn is_absent<T: ?Sized>(rendered: &str) -> bool {
    let type_name = std::any::type_name::<T>();
    type_name == "()" || (type_name.starts_with("core::option::Option<") && rendered == "None")
}

/// Header line followed by the rendering indented one level.
pub fn block(header: &str, rendered: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(rendered.lines().count() + 1);
    lines.push(format!("{}:", header));
    lines.extend(
        rendered
            .lines()
            .map(|line| format!("{}{}", DUMP_INDENT, line)),
    );
    lines
}

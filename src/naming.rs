//! Bean naming convention
//!
//! A class-based bean is addressed by the lower-camel form of its simple
//! type name: the first character lowercased, the rest unchanged. So
//! `my_app::services::UserService` becomes `userService` and
//! `dyn my_app::Greeter + Send` becomes `greeter`. Factory beans use the
//! literal operation name and never pass through here.

/// Strip module path, generic arguments and trait-object decoration from a
/// fully qualified type name.
pub fn simple_type_name(type_name: &str) -> &str {
    let mut name = type_name.trim();
    if let Some(rest) = name.strip_prefix("dyn ") {
        name = rest;
    }

    // Cut at the first generic bracket or trait-object bound
    let end = name.find(['<', ' ', '+']).unwrap_or(name.len());
    let path = &name[..end];

    path.rsplit("::").next().unwrap_or(path)
}

/// Lowercase the first character, leaving the remainder untouched.
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Bean name for a type under the naming convention.
#[inline]
pub fn bean_name_of<T: ?Sized + 'static>() -> String {
    lower_camel(simple_type_name(std::any::type_name::<T>()))
}

//! Field rules shared by the tenancy entities.

use std::net::IpAddr;

use crate::errors::FieldErrors;

pub const SLUG_MAX_LEN: usize = 50;

/// Required single-line text: non-blank and at most `max_len` characters.
pub fn check_required(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        return;
    }
    check_max_len(errors, field, value.trim(), max_len);
}

pub fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    let len = value.chars().count();
    if len > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters (it has {}).", max_len, len),
        );
    }
}

pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn check_slug(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, "This field is required.");
        return;
    }
    if !is_valid_slug(value) {
        errors.add(
            field,
            "Enter a valid 'slug' consisting of letters, numbers, underscores or hyphens.",
        );
    }
    check_max_len(errors, field, value, SLUG_MAX_LEN);
}

/// Lower-case slug derived from a display name; used when a form leaves the slug blank.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_dash = false;
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') { out.pop(); }
    out.truncate(SLUG_MAX_LEN);
    out
}

/// Parse `addr/len`, checking the mask length against the address family.
pub fn parse_cidr(value: &str) -> Result<(IpAddr, u8), String> {
    let (addr, len) = value
        .trim()
        .split_once('/')
        .ok_or_else(|| format!("{}: missing mask length", value))?;
    let addr: IpAddr = addr.parse().map_err(|_| format!("{}: invalid address", value))?;
    let len: u8 = len.parse().map_err(|_| format!("{}: invalid mask length", value))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if len > max {
        return Err(format!("{}: mask length exceeds {}", value, max));
    }
    Ok((addr, len))
}

//! Validation helpers for outbound payloads.

use validator::ValidationError;

/// Entries must stay strictly below this many characters.
pub const MAX_ENTRY_CHARS: usize = 255;

/// Validates that an entry holds between 1 and 254 characters.
///
/// # Examples
///
/// ```ignore
/// validate_entry_text("banana") // Ok
/// validate_entry_text("")       // Err - empty
/// ```
pub fn validate_entry_text(entry: &str) -> Result<(), ValidationError> {
    let count = entry.chars().count();

    if count == 0 {
        let mut err = ValidationError::new("entry_empty");
        err.message = Some("Entry must not be empty".into());
        return Err(err);
    }

    if count >= MAX_ENTRY_CHARS {
        let mut err = ValidationError::new("entry_length");
        err.message = Some(
            format!("Entry must be shorter than {MAX_ENTRY_CHARS} characters (got {count})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Whether the submit action should be enabled for the given text.
pub fn is_submittable(entry: &str) -> bool {
    validate_entry_text(entry).is_ok()
}

//! Interaction payload validation.
//!
//! Validation is fail-complete: every invalid field is collected into
//! a single [`ImsError::Validation`] so a client can fix all issues in
//! one round trip.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use ims_core::error::{FieldError, ImsError, ImsResult};
use ims_core::models::interaction::{CreateInteraction, Interaction, InteractionKind, UpdateInteraction};

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_LEAD_LENGTH: usize = 100;
pub const MAX_LOCATION_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_NOTES_LENGTH: usize = 2000;

fn check_required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

fn check_length(errors: &mut Vec<FieldError>, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
}

fn check_kind(errors: &mut Vec<FieldError>, value: &str) {
    if InteractionKind::parse(value).is_none() {
        errors.push(FieldError::new(
            "type",
            format!("must be one of: {}", kind_names().join(", ")),
        ));
    }
}

fn kind_names() -> Vec<&'static str> {
    InteractionKind::ALL.iter().map(|k| k.as_str()).collect()
}

fn check_timezone(errors: &mut Vec<FieldError>, value: &str) {
    if value.parse::<Tz>().is_err() {
        errors.push(FieldError::new(
            "timezone",
            "must be a recognized IANA timezone",
        ));
    }
}

fn check_date_order(
    errors: &mut Vec<FieldError>,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) {
    if let Some(end) = end {
        if end < start {
            errors.push(FieldError::new(
                "end_datetime",
                "must not be before start_datetime",
            ));
        }
    }
}

/// Validate a creation payload.
pub fn validate_create(input: &CreateInteraction) -> ImsResult<()> {
    let mut errors = Vec::new();

    check_required(&mut errors, "title", &input.title);
    check_length(&mut errors, "title", &input.title, MAX_TITLE_LENGTH);

    check_required(&mut errors, "type", &input.kind);
    if !input.kind.trim().is_empty() {
        check_kind(&mut errors, &input.kind);
    }

    check_required(&mut errors, "lead", &input.lead);
    check_length(&mut errors, "lead", &input.lead, MAX_LEAD_LENGTH);

    check_required(&mut errors, "timezone", &input.timezone);
    if !input.timezone.trim().is_empty() {
        check_timezone(&mut errors, &input.timezone);
    }

    if let Some(location) = &input.location {
        check_length(&mut errors, "location", location, MAX_LOCATION_LENGTH);
    }
    if let Some(description) = &input.description {
        check_length(
            &mut errors,
            "description",
            description,
            MAX_DESCRIPTION_LENGTH,
        );
    }
    if let Some(notes) = &input.notes {
        check_length(&mut errors, "notes", notes, MAX_NOTES_LENGTH);
    }

    check_date_order(&mut errors, input.start_datetime, input.end_datetime);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ImsError::Validation { errors })
    }
}

/// Validate an update payload against the record it modifies.
///
/// Only present fields are checked, but the start/end ordering is
/// evaluated on the *effective* values — the payload merged over the
/// current record — so a partial update cannot sneak in an inverted
/// range.
pub fn validate_update(input: &UpdateInteraction, current: &Interaction) -> ImsResult<()> {
    let mut errors = Vec::new();

    if let Some(title) = &input.title {
        check_required(&mut errors, "title", title);
        check_length(&mut errors, "title", title, MAX_TITLE_LENGTH);
    }
    if let Some(kind) = &input.kind {
        check_kind(&mut errors, kind);
    }
    if let Some(lead) = &input.lead {
        check_required(&mut errors, "lead", lead);
        check_length(&mut errors, "lead", lead, MAX_LEAD_LENGTH);
    }
    if let Some(timezone) = &input.timezone {
        check_timezone(&mut errors, timezone);
    }
    if let Some(Some(location)) = &input.location {
        check_length(&mut errors, "location", location, MAX_LOCATION_LENGTH);
    }
    if let Some(Some(description)) = &input.description {
        check_length(
            &mut errors,
            "description",
            description,
            MAX_DESCRIPTION_LENGTH,
        );
    }
    if let Some(Some(notes)) = &input.notes {
        check_length(&mut errors, "notes", notes, MAX_NOTES_LENGTH);
    }

    let effective_start = input.start_datetime.unwrap_or(current.start_datetime);
    let effective_end = match input.end_datetime {
        Some(end) => end,
        None => current.end_datetime,
    };
    check_date_order(&mut errors, effective_start, effective_end);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ImsError::Validation { errors })
    }
}

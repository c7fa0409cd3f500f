use validator::{Validate, ValidationErrors};

pub fn validate<T: Validate>(val: &T) -> Result<(), ValidationErrors> {
    val.validate()
}

/// Names of the fields that failed validation, sorted for stable reporting.
pub fn failed_fields<T: Validate>(val: &T) -> Vec<String> {
    match validate(val) {
        Ok(()) => Vec::new(),
        Err(errors) => {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect();
            fields.sort();
            fields
        }
    }
}

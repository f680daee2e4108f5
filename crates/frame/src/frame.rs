//! Frame - ordered collection of equal-length fields

use crate::error::{FrameError, Result};
use crate::field::{Field, FieldType};

/// Columnar table of named, typed fields
///
/// All fields in a frame have the same number of rows. The invariant is
/// checked whenever a field is attached; fields cannot be mutated once they
/// belong to a frame, so transformations build a new frame instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    name: String,
    fields: Vec<Field>,
}

impl Frame {
    /// Create a frame with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Create a frame holding a single field (always valid)
    pub fn from_field(name: impl Into<String>, field: Field) -> Self {
        Self {
            name: name.into(),
            fields: vec![field],
        }
    }

    /// Create a frame from fields, checking that all lengths agree
    pub fn from_fields(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let mut frame = Self::new(name);
        frame.fields.reserve(fields.len());
        for field in fields {
            frame.push_field(field)?;
        }
        Ok(frame)
    }

    /// Attach a field, builder style
    pub fn with_field(mut self, field: Field) -> Result<Self> {
        self.push_field(field)?;
        Ok(self)
    }

    /// Attach a field
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the field's row count differs from the
    /// fields already in the frame.
    pub fn push_field(&mut self, field: Field) -> Result<()> {
        if let Some(first) = self.fields.first()
            && first.len() != field.len()
        {
            return Err(FrameError::length_mismatch(
                field.name(),
                first.len(),
                field.len(),
            ));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Frame name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return a copy with a different name
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }

    /// Fields in order
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Consume the frame, returning its fields
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// First field with the given name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// All fields with the given name (one per label set)
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    /// First time field, if any
    pub fn time_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.field_type() == FieldType::Time)
    }

    /// Number of fields
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of rows (zero for a frame without fields)
    #[inline]
    pub fn row_count(&self) -> usize {
        self.fields.first().map_or(0, Field::len)
    }

    /// Whether the frame carries schema only
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Build a new frame holding only the fields for which `keep` returns true
    #[must_use]
    pub fn select_fields<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Field) -> bool,
    {
        Self {
            name: self.name.clone(),
            fields: self.fields.iter().filter(|f| keep(f)).cloned().collect(),
        }
    }
}

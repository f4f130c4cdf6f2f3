//! Filter forms.
//!
//! A form supplies filters when the grid is configured with
//! [crate::config::FilterSource::Form]. The grid disables its submit
//! controls while a fetch is in flight, and may restore its fields from a
//! history entry.

use std::cell::RefCell;
use std::rc::Rc;

use evolugrid_common::filter::Filter;

/// How a form field is restored from a filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Checked when a filter carries its name and value.
    Checkbox,
    /// Checked when a filter carries its name and value.
    Radio,
    /// Takes the value of the first filter with its name.
    Value,
}

pub trait FilterForm {
    /// Current name/value pairs, in field order. Unchecked boxes are left
    /// out.
    fn serialize(&self) -> Vec<Filter>;

    fn set_submit_enabled(&mut self, enabled: bool);

    #[allow(unused_variables)]
    fn populate(&mut self, filters: &[Filter]) {}
}

/// A form shared with the host, which keeps editing it between fetches.
impl<F: FilterForm> FilterForm for Rc<RefCell<F>> {
    fn serialize(&self) -> Vec<Filter> {
        self.borrow().serialize()
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.borrow_mut().set_submit_enabled(enabled)
    }

    fn populate(&mut self, filters: &[Filter]) {
        self.borrow_mut().populate(filters)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: InputKind,
    pub value: String,
    pub checked: bool,
}

/// A form held in memory, for hosts without a document model and for
/// tests.
#[derive(Debug, Clone, Default)]
pub struct SimpleForm {
    pub fields: Vec<FormField>,
    pub submit_enabled: bool,
}

impl SimpleForm {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            submit_enabled: true,
        }
    }

    pub fn input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            kind: InputKind::Value,
            value: value.into(),
            checked: false,
        });
        self
    }

    pub fn checkbox(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        checked: bool,
    ) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            kind: InputKind::Checkbox,
            value: value.into(),
            checked,
        });
        self
    }

    pub fn radio(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        checked: bool,
    ) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            kind: InputKind::Radio,
            value: value.into(),
            checked,
        });
        self
    }

    /// Set the value of every text-like field with this name.
    pub fn set_value(&mut self, name: &str, value: &str) {
        for f in self.fields.iter_mut().filter(|f| f.name == name) {
            if f.kind == InputKind::Value {
                f.value = value.to_string();
            }
        }
    }
}

impl FilterForm for SimpleForm {
    fn serialize(&self) -> Vec<Filter> {
        self.fields
            .iter()
            .filter(|f| f.kind == InputKind::Value || f.checked)
            .map(|f| Filter::new(f.name.clone(), f.value.clone()))
            .collect()
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
    }

    fn populate(&mut self, filters: &[Filter]) {
        for f in self.fields.iter_mut() {
            match f.kind {
                InputKind::Checkbox | InputKind::Radio => {
                    f.checked = filters
                        .iter()
                        .any(|x| x.name == f.name && x.value == f.value);
                }
                InputKind::Value => {
                    f.value = filters
                        .iter()
                        .find(|x| x.name == f.name)
                        .map(|x| x.value.clone())
                        .unwrap_or_default();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SimpleForm {
        SimpleForm::new()
            .input("q", "")
            .checkbox("tag", "red", false)
            .checkbox("tag", "blue", true)
            .radio("sort", "new", true)
            .radio("sort", "old", false)
    }

    #[test]
    fn serialize_skips_unchecked() {
        let mut f = form();
        f.set_value("q", "lamp");

        assert_eq!(
            f.serialize(),
            vec![
                Filter::new("q", "lamp"),
                Filter::new("tag", "blue"),
                Filter::new("sort", "new"),
            ]
        );
    }

    #[test]
    fn populate_by_input_kind() {
        let mut f = form();
        f.populate(&[
            Filter::new("q", "desk"),
            Filter::new("tag", "red"),
            Filter::new("sort", "old"),
        ]);

        assert_eq!(
            f.serialize(),
            vec![
                Filter::new("q", "desk"),
                Filter::new("tag", "red"),
                Filter::new("sort", "old"),
            ]
        );
    }
}

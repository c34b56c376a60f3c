/// A form input the binder can read, write and flag.
///
/// `value()` hands out a copy so validators can look at the rest of the
/// form while the value is checked.
pub trait HasValue {
    type Value: Clone + PartialEq + Default;

    fn value(&self) -> Self::Value;

    fn set_value(&mut self, value: Self::Value);

    /// The value of a field nobody filled in.
    fn empty_value(&self) -> Self::Value {
        Self::Value::default()
    }

    fn is_empty(&self) -> bool {
        self.value() == self.empty_value()
    }

    fn set_error(&mut self, error: Option<String>);

    fn error(&self) -> Option<&str>;
}

#[derive(Debug, Clone)]
pub struct TextField {
    pub label: &'static str,
    value: String,
    visible: bool,
    masked: bool,
    dirty: bool,
    touched: bool,
    error: Option<String>,
}

impl TextField {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            visible: true,
            masked: false,
            dirty: false,
            touched: false,
            error: None,
        }
    }

    pub fn password(label: &'static str) -> Self {
        Self {
            masked: true,
            ..Self::new(label)
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn text(&self) -> &str {
        &self.value
    }

    /// What the terminal shows for this field.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    pub fn push(&mut self, c: char) {
        self.value.push(c);
        self.mark_edited();
    }

    pub fn pop(&mut self) {
        if self.value.pop().is_some() {
            self.mark_edited();
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.dirty = false;
        self.error = None;
    }

    fn mark_edited(&mut self) {
        self.dirty = true;
        self.touched = true;
    }

    /// Returns whether the value changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Whether the user has ever edited this field.
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn reset(&mut self) {
        self.clear();
        self.touched = false;
    }
}

impl HasValue for TextField {
    type Value = String;

    fn value(&self) -> String {
        self.value.clone()
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
        self.dirty = false;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Checkbox {
    pub label: &'static str,
    checked: bool,
    error: Option<String>,
}

impl Checkbox {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            checked: false,
            error: None,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn toggle(&mut self) -> bool {
        self.checked = !self.checked;
        self.checked
    }
}

impl HasValue for Checkbox {
    type Value = bool;

    fn value(&self) -> bool {
        self.checked
    }

    fn set_value(&mut self, value: bool) {
        self.checked = value;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

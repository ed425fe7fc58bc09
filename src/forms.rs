use crate::auth::{FieldErrors, ProfileForm, SignInForm, SignUpForm, cycle_experience_level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    Toggle,
    Experience,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl FormField {
    fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            value: String::new(),
        }
    }

    pub fn is_checked(&self) -> bool {
        self.kind == FieldKind::Toggle && self.value == "yes"
    }

    /// Value as shown on screen; secrets are masked.
    pub fn display_value(&self) -> String {
        match self.kind {
            FieldKind::Secret => "*".repeat(self.value.chars().count()),
            FieldKind::Toggle => if self.is_checked() { "[x]" } else { "[ ]" }.to_string(),
            FieldKind::Text | FieldKind::Experience => self.value.clone(),
        }
    }
}

/// Keyboard-driven form: one focused field, typed characters go into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextForm {
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub errors: FieldErrors,
    pub submitting: bool,
}

impl TextForm {
    fn with_fields(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            focus: 0,
            errors: FieldErrors::new(),
            submitting: false,
        }
    }

    pub fn sign_in() -> Self {
        Self::with_fields(vec![
            FormField::new("email", "Email", FieldKind::Text),
            FormField::new("password", "Password", FieldKind::Secret),
        ])
    }

    pub fn sign_up() -> Self {
        Self::with_fields(vec![
            FormField::new("first_name", "First name", FieldKind::Text),
            FormField::new("last_name", "Last name", FieldKind::Text),
            FormField::new("email", "Email", FieldKind::Text),
            FormField::new("password", "Password", FieldKind::Secret),
            FormField::new("confirm_password", "Confirm password", FieldKind::Secret),
            FormField::new("team_name", "Team name", FieldKind::Text),
            FormField::new("agree_terms", "Agree to terms", FieldKind::Toggle),
        ])
    }

    pub fn profile(initial: &ProfileForm) -> Self {
        let mut form = Self::with_fields(vec![
            FormField::new("first_name", "First name", FieldKind::Text),
            FormField::new("last_name", "Last name", FieldKind::Text),
            FormField::new("phone_number", "Phone number", FieldKind::Text),
            FormField::new("experience_level", "Experience level", FieldKind::Experience),
        ]);
        form.set("first_name", &initial.first_name);
        form.set("last_name", &initial.last_name);
        form.set("phone_number", &initial.phone_number);
        form.set("experience_level", &initial.experience_level);
        form
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
            field.value = value.to_string();
        }
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push_char(&mut self, ch: char) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match field.kind {
            FieldKind::Text | FieldKind::Secret => {
                field.value.push(ch);
                self.errors.remove(field.key);
            }
            FieldKind::Toggle | FieldKind::Experience if ch == ' ' => self.activate(),
            FieldKind::Toggle | FieldKind::Experience => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus)
            && matches!(field.kind, FieldKind::Text | FieldKind::Secret)
        {
            field.value.pop();
        }
    }

    /// Space on a toggle or choice field.
    pub fn activate(&mut self) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match field.kind {
            FieldKind::Toggle => {
                field.value = if field.value == "yes" { String::new() } else { "yes".to_string() };
            }
            FieldKind::Experience => field.value = cycle_experience_level(&field.value),
            FieldKind::Text | FieldKind::Secret => return,
        }
        self.errors.remove(field.key);
    }

    pub fn clear_secrets(&mut self) {
        for field in &mut self.fields {
            if field.kind == FieldKind::Secret {
                field.value.clear();
            }
        }
    }

    pub fn to_sign_in(&self) -> SignInForm {
        SignInForm {
            email: self.value("email").to_string(),
            password: self.value("password").to_string(),
        }
    }

    pub fn to_sign_up(&self) -> SignUpForm {
        SignUpForm {
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            email: self.value("email").to_string(),
            password: self.value("password").to_string(),
            confirm_password: self.value("confirm_password").to_string(),
            team_name: self.value("team_name").to_string(),
            agree_terms: self.value("agree_terms") == "yes",
        }
    }

    pub fn to_profile(&self) -> ProfileForm {
        ProfileForm {
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            phone_number: self.value("phone_number").to_string(),
            experience_level: self.value("experience_level").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_goes_to_focused_field_only() {
        let mut form = TextForm::sign_in();
        for ch in "a@b.io".chars() {
            form.push_char(ch);
        }
        form.focus_next();
        form.push_char('x');
        form.backspace();
        form.push_char('p');
        assert_eq!(form.value("email"), "a@b.io");
        assert_eq!(form.value("password"), "p");
        assert_eq!(form.fields[1].display_value(), "*");
    }

    #[test]
    fn space_toggles_terms_and_cycles_experience() {
        let mut form = TextForm::sign_up();
        form.focus = form.fields.len() - 1;
        form.push_char(' ');
        assert!(form.to_sign_up().agree_terms);
        form.activate();
        assert!(!form.to_sign_up().agree_terms);

        let mut profile = TextForm::profile(&ProfileForm::default());
        profile.focus = 3;
        profile.activate();
        assert_eq!(profile.value("experience_level"), "Beginner");
        profile.activate();
        assert_eq!(profile.value("experience_level"), "Enthusiast");
    }
}

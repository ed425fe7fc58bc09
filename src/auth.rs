use std::collections::BTreeMap;

use crate::api::{ProfileUpdate, SignInRequest, SignUpRequest};
use crate::session::Session;

pub const EXPERIENCE_LEVELS: [&str; 3] = ["Beginner", "Enthusiast", "Pro"];

/// Field name -> message. Empty means the form may be submitted.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub team_name: String,
    pub agree_terms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub experience_level: String,
}

impl SignUpForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);
        check_email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        } else if self.password.chars().count() < 8 {
            errors.insert("password", "Password must be at least 8 characters".to_string());
        } else if !self.password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.insert(
                "password",
                "Password must contain at least one uppercase letter".to_string(),
            );
        } else if !self.password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.insert(
                "password",
                "Password must contain at least one lowercase letter".to_string(),
            );
        } else if !self.password.chars().any(|c| c.is_ascii_digit()) {
            errors.insert("password", "Password must contain at least one number".to_string());
        }

        if self.confirm_password.is_empty() {
            errors.insert("confirm_password", "Please confirm your password".to_string());
        } else if self.password != self.confirm_password {
            errors.insert("confirm_password", "Passwords do not match".to_string());
        }

        let team = self.team_name.trim();
        if team.is_empty() {
            errors.insert("team_name", "Team name is required".to_string());
        } else if team.chars().count() < 2 {
            errors.insert("team_name", "Team name must be at least 2 characters".to_string());
        } else if team.chars().count() > 100 {
            errors.insert("team_name", "Team name must be less than 100 characters".to_string());
        }

        if !self.agree_terms {
            errors.insert(
                "agree_terms",
                "You must agree to the terms and privacy policy".to_string(),
            );
        }
        errors
    }

    pub fn to_request(&self) -> SignUpRequest {
        SignUpRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            team_name: self.team_name.trim().to_string(),
        }
    }
}

impl SignInForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        }
        errors
    }

    pub fn to_request(&self) -> SignInRequest {
        SignInRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

impl ProfileForm {
    pub fn from_session(session: &Session) -> Self {
        let user = session.user();
        let profile = session.profile();
        Self {
            first_name: user.map(|u| u.first_name.clone()).unwrap_or_default(),
            last_name: user.map(|u| u.last_name.clone()).unwrap_or_default(),
            phone_number: profile
                .and_then(|p| p.phone_number.clone())
                .unwrap_or_default(),
            experience_level: profile
                .and_then(|p| p.experience_level.clone())
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !self.first_name.trim().is_empty() {
            check_name(&mut errors, "first_name", "First name", &self.first_name);
        }
        if !self.last_name.trim().is_empty() {
            check_name(&mut errors, "last_name", "Last name", &self.last_name);
        }
        let phone = self.phone_number.trim();
        if !phone.is_empty() {
            let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
            let allowed = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !allowed || !(7..=15).contains(&digits) {
                errors.insert("phone_number", "Please enter a valid phone number".to_string());
            }
        }
        let level = self.experience_level.trim();
        if !level.is_empty() && !EXPERIENCE_LEVELS.contains(&level) {
            errors.insert(
                "experience_level",
                format!("Experience level must be one of {}", EXPERIENCE_LEVELS.join(", ")),
            );
        }
        errors
    }

    /// Only fields that differ from `baseline` are sent.
    pub fn diff(&self, baseline: &ProfileForm) -> ProfileUpdate {
        let changed = |now: &str, before: &str| {
            let now = now.trim();
            (now != before.trim() && !now.is_empty()).then(|| now.to_string())
        };
        ProfileUpdate {
            first_name: changed(&self.first_name, &baseline.first_name),
            last_name: changed(&self.last_name, &baseline.last_name),
            phone_number: changed(&self.phone_number, &baseline.phone_number),
            experience_level: changed(&self.experience_level, &baseline.experience_level),
        }
    }
}

/// Step to the next experience level, wrapping; unknown values start over.
pub fn cycle_experience_level(current: &str) -> String {
    let idx = EXPERIENCE_LEVELS
        .iter()
        .position(|level| *level == current.trim())
        .map(|idx| (idx + 1) % EXPERIENCE_LEVELS.len())
        .unwrap_or(0);
    EXPERIENCE_LEVELS[idx].to_string()
}

pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.insert("email", "Please enter a valid email address".to_string());
    }
}

fn check_name(errors: &mut FieldErrors, key: &'static str, label: &str, value: &str) {
    let value = value.trim();
    let len = value.chars().count();
    if value.is_empty() {
        errors.insert(key, format!("{label} is required"));
    } else if len < 2 {
        errors.insert(key, format!("{label} must be at least 2 characters"));
    } else if len > 50 {
        errors.insert(key, format!("{label} must be less than 50 characters"));
    }
}

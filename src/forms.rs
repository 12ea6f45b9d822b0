//! Input validation for place and account forms
//!
//! Every check runs before any network traffic, so a rejected form never
//! uploads images or touches the cache.

use crate::config::UploadConfig;
use crate::error::{PlaceboardError, PlaceboardResult};
use crate::upload::UploadFile;
use std::collections::HashSet;

const MIN_NAME_CHARS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 8;

/// Province names indexed by wilaya code minus one
const WILAYAS: [&str; 58] = [
    "Adrar", "Chlef", "Laghouat", "Oum El Bouaghi", "Batna", "Bejaia", "Biskra", "Bechar",
    "Blida", "Bouira", "Tamanrasset", "Tebessa", "Tlemcen", "Tiaret", "Tizi Ouzou", "Alger",
    "Djelfa", "Jijel", "Setif", "Saida", "Skikda", "Sidi Bel Abbes", "Annaba", "Guelma",
    "Constantine", "Medea", "Mostaganem", "M'Sila", "Mascara", "Ouargla", "Oran", "El Bayadh",
    "Illizi", "Bordj Bou Arreridj", "Boumerdes", "El Tarf", "Tindouf", "Tissemsilt", "El Oued",
    "Khenchela", "Souk Ahras", "Tipaza", "Mila", "Ain Defla", "Naama", "Ain Temouchent",
    "Ghardaia", "Relizane", "Timimoun", "Bordj Badji Mokhtar", "Ouled Djellal", "Beni Abbes",
    "In Salah", "In Guezzam", "Touggourt", "Djanet", "El M'Ghair", "El Meniaa",
];

/// Name of the province with `code`, if the code exists
pub fn wilaya_name(code: u8) -> Option<&'static str> {
    WILAYAS.get(usize::from(code).checked_sub(1)?).copied()
}

pub fn validate_name(name: &str) -> PlaceboardResult<()> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(PlaceboardError::validation("name", "Name is required"));
    }
    if len < MIN_NAME_CHARS {
        return Err(PlaceboardError::validation(
            "name",
            format!("Name is at least {} characters", MIN_NAME_CHARS),
        ));
    }
    Ok(())
}

pub fn validate_wilaya(code: i64) -> PlaceboardResult<u8> {
    u8::try_from(code)
        .ok()
        .filter(|c| wilaya_name(*c).is_some())
        .ok_or_else(|| PlaceboardError::validation("wilaya", "Invalid wilaya code"))
}

/// Limits applied to image selections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRules {
    pub max_images: usize,
    pub max_image_bytes: u64,
}

impl From<&UploadConfig> for ImageRules {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_images: config.max_images,
            max_image_bytes: config.max_image_bytes,
        }
    }
}

impl ImageRules {
    fn check(&self, files: &[UploadFile], min: usize) -> PlaceboardResult<()> {
        if files.len() < min {
            return Err(PlaceboardError::validation(
                "images",
                "Please select at least one file",
            ));
        }
        if files.len() > self.max_images {
            return Err(PlaceboardError::validation(
                "images",
                format!("Please select up to {} files", self.max_images),
            ));
        }
        if let Some(big) = files
            .iter()
            .find(|f| f.len() as u64 > self.max_image_bytes)
        {
            return Err(PlaceboardError::validation(
                "images",
                format!(
                    "{} is larger than {} KiB",
                    big.name(),
                    self.max_image_bytes / 1024
                ),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = files.iter().find(|f| !seen.insert(f.digest())) {
            return Err(PlaceboardError::validation(
                "images",
                format!("{} was selected twice", dup.name()),
            ));
        }
        Ok(())
    }
}

/// Fields shared by the create and edit forms
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceFields {
    pub name: String,
    pub description: String,
    pub wilaya_code: i64,
}

impl PlaceFields {
    /// Validate and return the wilaya code as stored by the API
    pub fn validate(&self) -> PlaceboardResult<u8> {
        validate_name(&self.name)?;
        validate_wilaya(self.wilaya_code)
    }
}

/// Input of the create-place workflow
#[derive(Debug, Clone)]
pub struct CreatePlaceForm {
    pub fields: PlaceFields,
    pub images: Vec<UploadFile>,
}

impl CreatePlaceForm {
    pub fn validate(&self, rules: ImageRules) -> PlaceboardResult<u8> {
        let code = self.fields.validate()?;
        rules.check(&self.images, 1)?;
        Ok(code)
    }
}

/// Input of the edit-place workflow
#[derive(Debug, Clone)]
pub struct EditPlaceForm {
    pub fields: PlaceFields,
    /// Existing image URLs to keep, in display order
    pub kept_images: Vec<String>,
    pub new_images: Vec<UploadFile>,
}

impl EditPlaceForm {
    pub fn validate(&self, rules: ImageRules) -> PlaceboardResult<u8> {
        let code = self.fields.validate()?;
        rules.check(&self.new_images, 0)?;
        Ok(code)
    }

    /// Kept images followed by the newly uploaded ones
    pub fn final_images(&self, uploaded: Vec<String>) -> Vec<String> {
        self.kept_images.iter().cloned().chain(uploaded).collect()
    }
}

fn validate_email(email: &str) -> PlaceboardResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PlaceboardError::validation("email", "Email is required"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(PlaceboardError::validation("email", "Invalid email"));
    }
    Ok(())
}

fn validate_password(password: &str) -> PlaceboardResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(PlaceboardError::validation(
            "password",
            format!("Password is at least {} characters", MIN_PASSWORD_CHARS),
        ));
    }
    Ok(())
}

/// Credentials entered for `login`
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> PlaceboardResult<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Account details entered for `register`
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> PlaceboardResult<()> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ImageRules {
        ImageRules::from(&UploadConfig::default())
    }

    fn image(name: &str, len: usize) -> UploadFile {
        UploadFile::new(name, vec![name.len() as u8; len])
    }

    fn fields(name: &str, wilaya: i64) -> PlaceFields {
        PlaceFields {
            name: name.to_string(),
            description: String::new(),
            wilaya_code: wilaya,
        }
    }

    fn field_of(err: PlaceboardError) -> String {
        match err {
            PlaceboardError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("Casbah").is_ok());
        assert!(validate_name("  ").is_err());
        assert_eq!(
            validate_name("Ab").unwrap_err().to_string(),
            "Invalid name: Name is at least 3 characters"
        );
    }

    #[test]
    fn wilaya_bounds() {
        assert_eq!(validate_wilaya(1).unwrap(), 1);
        assert_eq!(validate_wilaya(58).unwrap(), 58);
        assert!(validate_wilaya(0).is_err());
        assert!(validate_wilaya(59).is_err());
        assert!(validate_wilaya(-16).is_err());
        assert_eq!(wilaya_name(16), Some("Alger"));
        assert_eq!(wilaya_name(0), None);
    }

    #[test]
    fn create_needs_one_to_max_images() {
        let mut form = CreatePlaceForm {
            fields: fields("Casbah", 16),
            images: vec![],
        };
        assert_eq!(field_of(form.validate(rules()).unwrap_err()), "images");

        form.images = vec![image("a.jpg", 10)];
        assert_eq!(form.validate(rules()).unwrap(), 16);

        form.images = vec![image("a.jpg", 10), image("bb.jpg", 10), image("ccc.jpg", 10)];
        assert_eq!(field_of(form.validate(rules()).unwrap_err()), "images");
    }

    #[test]
    fn oversized_and_duplicate_images_rejected() {
        let too_big = CreatePlaceForm {
            fields: fields("Casbah", 16),
            images: vec![image("a.jpg", 1024 * 1024 + 1)],
        };
        assert!(too_big.validate(rules()).is_err());

        let twice = CreatePlaceForm {
            fields: fields("Casbah", 16),
            images: vec![image("a.jpg", 10), image("a.jpg", 10)],
        };
        let err = twice.validate(rules()).unwrap_err();
        assert!(err.to_string().contains("selected twice"));
    }

    #[test]
    fn edit_allows_no_new_images() {
        let form = EditPlaceForm {
            fields: fields("Tipaza", 42),
            kept_images: vec!["https://ik.example/old.jpg".to_string()],
            new_images: vec![],
        };
        assert_eq!(form.validate(rules()).unwrap(), 42);
        assert_eq!(
            form.final_images(vec!["https://ik.example/new.jpg".to_string()]),
            vec!["https://ik.example/old.jpg", "https://ik.example/new.jpg"]
        );
    }

    #[test]
    fn account_forms() {
        let login = LoginForm {
            email: "amel@example.com".into(),
            password: "hunter22".into(),
        };
        assert!(login.validate().is_ok());

        let short = LoginForm {
            password: "short".into(),
            ..login.clone()
        };
        assert_eq!(field_of(short.validate().unwrap_err()), "password");

        for email in ["", "amel", "amel@", "@example.com", "amel@example", "a b@example.com"] {
            let form = LoginForm {
                email: email.into(),
                ..login.clone()
            };
            assert_eq!(field_of(form.validate().unwrap_err()), "email", "{email}");
        }

        let register = RegisterForm {
            name: "Am".into(),
            email: "amel@example.com".into(),
            password: "hunter22".into(),
        };
        assert_eq!(field_of(register.validate().unwrap_err()), "name");
    }
}

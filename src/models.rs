use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::err::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

/// A student that passed validation and has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStudent {
    pub name: String,
    pub age: i32,
}

/// Raw `name`/`age` pair as it arrives in a JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<Value>,
}

/// Same pair from a url-encoded form, where everything is text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
}

impl From<StudentForm> for StudentPayload {
    fn from(form: StudentForm) -> Self {
        Self {
            name: form.name,
            age: form.age.map(Value::String),
        }
    }
}

impl StudentPayload {
    pub fn validate(self) -> Result<NewStudent, Error> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::validation("Name is required"))?
            .to_string();
        let age = parse_age(self.age.as_ref())?;
        Ok(NewStudent { name, age })
    }
}

fn parse_age(raw: Option<&Value>) -> Result<i32, Error> {
    let age = match raw {
        None | Some(Value::Null) => return Err(Error::validation("Age is required")),
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Err(Error::validation("Age is required"))
        }
        Some(Value::String(text)) => text.trim().parse::<i64>().map_err(|err| match err.kind() {
            IntErrorKind::PosOverflow => Error::validation("Age is out of range"),
            IntErrorKind::NegOverflow => Error::validation("Age must be a positive number"),
            _ => Error::validation("Age must be a whole number"),
        })?,
        Some(Value::Number(number)) => whole_number(number)?,
        Some(_) => return Err(Error::validation("Age must be a whole number")),
    };
    if age <= 0 {
        return Err(Error::validation("Age must be a positive number"));
    }
    i32::try_from(age).map_err(|_| Error::validation("Age is out of range"))
}

/// `31` and `31.0` are the same age; `31.5` is not an age.
fn whole_number(number: &Number) -> Result<i64, Error> {
    if let Some(age) = number.as_i64() {
        return Ok(age);
    }
    if number.is_u64() {
        return Err(Error::validation("Age is out of range"));
    }
    match number.as_f64() {
        Some(age) if age.fract() == 0.0 => {
            if age <= 0.0 {
                Err(Error::validation("Age must be a positive number"))
            } else if age > f64::from(i32::MAX) {
                Err(Error::validation("Age is out of range"))
            } else {
                Ok(age as i64)
            }
        }
        _ => Err(Error::validation("Age must be a whole number")),
    }
}

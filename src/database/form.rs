use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use super::error::Error;

pub type FormData = HashMap<String, Value>;

/// Loosely-typed form payload with typed getters, for endpoints that take a
/// handful of scalar fields instead of a full JSON document.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_value<T>(&self, key: &'static str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| Error::invalid_field(key, "invalid type")),
            None => Err(Error::invalid_field(key, "missing field")),
        }
    }

    pub fn get_number<T>(&self, key: &'static str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => v
                    .parse()
                    .map_err(|_e| Error::invalid_field(key, "not a number")),
                None => Err(Error::invalid_field(key, "expected a string")),
            },
            None => Err(Error::invalid_field(key, "missing field")),
        }
    }

    pub fn get_str(&self, key: &'static str) -> Result<String, Error> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(Error::invalid_field(key, "expected a string")),
            },
            None => Err(Error::invalid_field(key, "missing field")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientEntry {
    pub id: i32,
    pub amount: i32,
}

/// Candidate recipe payload as submitted by the client. `image` carries a
/// base64 data URI and is decoded separately; on update it may be omitted to
/// keep the stored image.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientEntry>,
    pub tags: Vec<i32>,
}

impl RecipeForm {
    /// Pure validation, run before any write. Reference resolution (dangling
    /// ingredient or tag ids) is checked against the catalog in the actions
    /// layer.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_field("name", "must not be empty"));
        }
        if self.cooking_time < 1 {
            return Err(Error::invalid_field(
                "cooking_time",
                "must be a positive integer",
            ));
        }
        if self.ingredients.is_empty() {
            return Err(Error::invalid_field(
                "ingredients",
                "at least one ingredient is required",
            ));
        }

        let mut seen: HashSet<i32> = HashSet::with_capacity(self.ingredients.len());
        for entry in &self.ingredients {
            if entry.amount < 1 {
                return Err(Error::InvalidQuantity {
                    ingredient_id: entry.id,
                    amount: entry.amount,
                });
            }
            // A recipe listing the same ingredient twice with two amounts is
            // ambiguous (replace vs. add), so it is rejected at the boundary.
            if !seen.insert(entry.id) {
                return Err(Error::DuplicateIngredient {
                    ingredient_id: entry.id,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(entries: &[(i32, i32)], cooking_time: i32) -> RecipeForm {
        RecipeForm {
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            image: None,
            cooking_time,
            ingredients: entries
                .iter()
                .map(|(id, amount)| IngredientEntry {
                    id: *id,
                    amount: *amount,
                })
                .collect(),
            tags: vec![1],
        }
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        assert!(payload(&[(1, 200), (2, 100)], 30).validate().is_ok());
    }

    #[test]
    fn rejects_repeated_ingredients() {
        let result = payload(&[(1, 200), (2, 100), (1, 50)], 30).validate();
        assert!(matches!(
            result,
            Err(Error::DuplicateIngredient { ingredient_id: 1 })
        ));
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(matches!(
            payload(&[(1, 0)], 30).validate(),
            Err(Error::InvalidQuantity {
                ingredient_id: 1,
                amount: 0
            })
        ));
        assert!(matches!(
            payload(&[(1, -5)], 30).validate(),
            Err(Error::InvalidQuantity {
                ingredient_id: 1,
                amount: -5
            })
        ));
    }

    #[test]
    fn rejects_non_positive_cooking_time() {
        assert!(matches!(
            payload(&[(1, 200)], 0).validate(),
            Err(Error::InvalidField { field: "cooking_time", .. })
        ));
        assert!(matches!(
            payload(&[(1, 200)], -10).validate(),
            Err(Error::InvalidField { field: "cooking_time", .. })
        ));
    }

    #[test]
    fn rejects_empty_ingredient_list_and_blank_name() {
        assert!(matches!(
            payload(&[], 30).validate(),
            Err(Error::InvalidField { field: "ingredients", .. })
        ));

        let mut form = payload(&[(1, 200)], 30);
        form.name = String::from("   ");
        assert!(matches!(
            form.validate(),
            Err(Error::InvalidField { field: "name", .. })
        ));
    }

    #[test]
    fn form_getters_report_missing_and_mistyped_fields() {
        let mut data = FormData::new();
        data.insert(String::from("offset"), Value::String(String::from("20")));
        data.insert(String::from("search"), Value::Bool(true));
        let form = Form::from_data(data);

        assert_eq!(form.get_number::<i64>("offset").unwrap(), 20);
        assert!(form.get_str("search").is_err());
        assert!(form.get_str("missing").is_err());
    }
}

//! Optimistic strategies for place writes

use super::reconciler::OptimisticUpdate;
use crate::api::{NewPlace, Place, PlaceUpdate, RequestDescriptor};
use crate::queries::keys;
use crate::query::QueryKey;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

/// Fields of a place that an edit may change
const EDITABLE_FIELDS: [&str; 4] = ["name", "description", "wilayaCode", "images"];

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

fn list_of(current: Option<&Value>) -> Option<Vec<Value>> {
    current.and_then(Value::as_array).cloned()
}

/// Copy the editable fields of `from` onto `into`
fn merge_fields(into: &mut Map<String, Value>, from: &Value) {
    for field in EDITABLE_FIELDS {
        if let Some(value) = from.get(field) {
            into.insert(field.to_string(), value.clone());
        }
    }
}

/// `POST /places`, shown at the end of the list under a temporary id
#[derive(Debug, Clone)]
pub struct CreatePlace {
    place: NewPlace,
    temp_id: String,
}

impl CreatePlace {
    pub fn new(place: NewPlace) -> Self {
        Self {
            place,
            temp_id: format!("temp-{}", Uuid::new_v4()),
        }
    }

    /// Id the record carries until the server assigns one
    pub fn temp_id(&self) -> &str {
        &self.temp_id
    }

    fn optimistic_record(&self) -> Option<Value> {
        let now = Utc::now();
        let record = Place {
            id: self.temp_id.clone(),
            name: self.place.name.clone(),
            description: self.place.description.clone(),
            wilaya_code: self.place.wilaya_code,
            images: self.place.images.clone(),
            created_by_id: self.place.created_by_id.clone(),
            user_id: None,
            created_at: now,
            updated_at: now,
        };
        serde_json::to_value(record).ok()
    }
}

impl OptimisticUpdate for CreatePlace {
    fn name(&self) -> &'static str {
        "create_place"
    }

    fn request(&self) -> RequestDescriptor {
        let body = serde_json::to_value(&self.place).unwrap_or(Value::Null);
        RequestDescriptor::post("/places", body)
    }

    fn keys(&self) -> Vec<QueryKey> {
        vec![keys::places()]
    }

    fn predict(&self, _key: &QueryKey, current: Option<&Value>) -> Option<Value> {
        let mut list = list_of(current).unwrap_or_default();
        list.push(self.optimistic_record()?);
        Some(Value::Array(list))
    }

    fn confirm(&self, _key: &QueryKey, current: Option<&Value>, confirmed: &Value) -> Option<Value> {
        let mut list = list_of(current).unwrap_or_default();
        let confirmed_id = id_of(confirmed);

        match list.iter().position(|p| id_of(p) == Some(self.temp_id.as_str())) {
            Some(index) => list[index] = confirmed.clone(),
            // A refetch may already have replaced the optimistic record
            None if list.iter().any(|p| id_of(p) == confirmed_id) => {}
            None => list.push(confirmed.clone()),
        }
        debug!("{} resolved to {:?}", self.temp_id, confirmed_id);
        Some(Value::Array(list))
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![keys::places(), keys::stats()]
    }
}

/// `PUT /places/{id}`, merged into the list and the detail entry
#[derive(Debug, Clone)]
pub struct UpdatePlace {
    update: PlaceUpdate,
}

impl UpdatePlace {
    pub fn new(update: PlaceUpdate) -> Self {
        Self { update }
    }

    fn changes(&self) -> Value {
        serde_json::to_value(&self.update).unwrap_or(Value::Null)
    }

    fn is_list(key: &QueryKey) -> bool {
        key.len() == 1
    }

    fn merged_list(&self, current: Option<&Value>, from: &Value, replace: bool) -> Option<Value> {
        let mut list = list_of(current)?;
        let item = list
            .iter_mut()
            .find(|p| id_of(p) == Some(self.update.place_id.as_str()))?;
        if replace {
            *item = from.clone();
        } else if let Value::Object(fields) = item {
            merge_fields(fields, from);
        }
        Some(Value::Array(list))
    }

    fn merged_detail(current: Option<&Value>, from: &Value) -> Option<Value> {
        let mut detail = current.and_then(Value::as_object).cloned()?;
        merge_fields(&mut detail, from);
        if let Some(updated_at) = from.get("updatedAt") {
            detail.insert("updatedAt".to_string(), updated_at.clone());
        }
        Some(Value::Object(detail))
    }
}

impl OptimisticUpdate for UpdatePlace {
    fn name(&self) -> &'static str {
        "update_place"
    }

    fn request(&self) -> RequestDescriptor {
        RequestDescriptor::put(format!("/places/{}", self.update.place_id), self.changes())
    }

    fn keys(&self) -> Vec<QueryKey> {
        vec![keys::places(), keys::place(&self.update.place_id)]
    }

    fn predict(&self, key: &QueryKey, current: Option<&Value>) -> Option<Value> {
        let changes = self.changes();
        if Self::is_list(key) {
            self.merged_list(current, &changes, false)
        } else {
            Self::merged_detail(current, &changes)
        }
    }

    fn confirm(&self, key: &QueryKey, current: Option<&Value>, confirmed: &Value) -> Option<Value> {
        if Self::is_list(key) {
            self.merged_list(current, confirmed, true)
        } else {
            // The detail carries `createdBy`, which the write does not return
            Self::merged_detail(current, confirmed)
        }
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![keys::places()]
    }
}

/// `DELETE /places/{id}`, removed from the list at once
#[derive(Debug, Clone)]
pub struct DeletePlace {
    id: String,
}

impl DeletePlace {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    fn without(&self, current: Option<&Value>) -> Option<Value> {
        let list = list_of(current)?;
        Some(Value::Array(
            list.into_iter()
                .filter(|p| id_of(p) != Some(self.id.as_str()))
                .collect(),
        ))
    }
}

impl OptimisticUpdate for DeletePlace {
    fn name(&self) -> &'static str {
        "delete_place"
    }

    fn request(&self) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/places/{}", self.id))
    }

    fn keys(&self) -> Vec<QueryKey> {
        vec![keys::places(), keys::place(&self.id)]
    }

    fn predict(&self, key: &QueryKey, current: Option<&Value>) -> Option<Value> {
        if key.len() == 1 {
            self.without(current)
        } else {
            None
        }
    }

    fn confirm(&self, key: &QueryKey, current: Option<&Value>, _confirmed: &Value) -> Option<Value> {
        if key.len() == 1 {
            self.without(current)
        } else {
            None
        }
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![keys::places(), keys::stats()]
    }

    fn evicts(&self) -> Vec<QueryKey> {
        vec![keys::place(&self.id)]
    }
}

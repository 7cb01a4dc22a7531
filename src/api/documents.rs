//! Purpose: Document collection operations against `/document` and `/admin`.
//! Exports: Collection/object CRUD, count, field update, and ACL methods on `Client`.
//! Role: Thin resource surface; one method call is one request.
//! Invariants: `save` creates (POST) without an `id` and updates (PUT) with one.
//! Invariants: No client-side validation of identifiers beyond presence.
#![allow(clippy::result_large_err)]

use crate::api::client::{Client, ListOptions, Permission, apply_list_options};
use crate::core::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize)]
struct CountData {
    count: u64,
}

#[derive(Serialize)]
struct FieldUpdate<'a> {
    data: &'a Value,
}

impl Client {
    /// POST `/admin/collection/{collection}` (administrator role required
    /// by the backend).
    pub fn create_collection(&self, collection: &str) -> Result<Value, Error> {
        let url = self.url(&["admin", "collection", collection])?;
        self.request_json::<(), Value>("POST", &url, None)
    }

    /// DELETE `/admin/collection/{collection}`.
    pub fn delete_collection(&self, collection: &str) -> Result<(), Error> {
        let url = self.url(&["admin", "collection", collection])?;
        let _: Value = self.request_json::<(), Value>("DELETE", &url, None)?;
        Ok(())
    }

    /// First page of a collection, sized by the configured page length.
    pub fn load_collection(&self, collection: &str) -> Result<Vec<Value>, Error> {
        let options = ListOptions {
            page: Some(0),
            records_per_page: Some(self.config().page_length()),
            ..ListOptions::default()
        };
        self.load_collection_with_options(collection, &options)
    }

    /// GET `/document/{collection}` with explicit paging/filter options.
    pub fn load_collection_with_options(
        &self,
        collection: &str,
        options: &ListOptions,
    ) -> Result<Vec<Value>, Error> {
        let mut url = self.url(&["document", collection])?;
        apply_list_options(&mut url, options);
        self.request_json::<(), Vec<Value>>("GET", &url, None)
    }

    /// GET `/document/{collection}/{id}`.
    pub fn load_object(&self, collection: &str, id: &str) -> Result<Value, Error> {
        let url = self.url(&["document", collection, id])?;
        self.request_json::<(), Value>("GET", &url, None)
    }

    /// Create or update depending on whether the object carries an `id`.
    /// Creation returns the stored object including its server-assigned id;
    /// saving that result again updates the same resource.
    pub fn save(&self, collection: &str, object: &Value) -> Result<Value, Error> {
        match object_id(object) {
            Some(id) => {
                let url = self.url(&["document", collection, id])?;
                self.request_json("PUT", &url, Some(object))
            }
            None => {
                let url = self.url(&["document", collection])?;
                self.request_json("POST", &url, Some(object))
            }
        }
    }

    /// PUT `/document/{collection}/{id}` replacing the object body.
    pub fn update_object(&self, collection: &str, id: &str, data: &Value) -> Result<Value, Error> {
        let url = self.url(&["document", collection, id])?;
        self.request_json("PUT", &url, Some(data))
    }

    /// PUT `/document/{collection}/{id}/.{field}` with the new field value.
    pub fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: &Value,
    ) -> Result<Value, Error> {
        let segment = format!(".{field}");
        let url = self.url(&["document", collection, id, &segment])?;
        self.request_json("PUT", &url, Some(&FieldUpdate { data: value }))
    }

    /// DELETE `/document/{collection}/{id}`.
    pub fn delete_object(&self, collection: &str, id: &str) -> Result<(), Error> {
        let url = self.url(&["document", collection, id])?;
        let _: Value = self.request_json::<(), Value>("DELETE", &url, None)?;
        Ok(())
    }

    /// GET `/document/{collection}/count`, lifting `data.count`.
    pub fn count(&self, collection: &str) -> Result<u64, Error> {
        let url = self.url(&["document", collection, "count"])?;
        let data: CountData = self.request_json::<(), _>("GET", &url, None)?;
        Ok(data.count)
    }

    pub fn grant_user_access_to_object(
        &self,
        collection: &str,
        id: &str,
        permission: Permission,
        username: &str,
    ) -> Result<(), Error> {
        self.object_acl("PUT", collection, id, permission, "user", username)
    }

    pub fn revoke_user_access_to_object(
        &self,
        collection: &str,
        id: &str,
        permission: Permission,
        username: &str,
    ) -> Result<(), Error> {
        self.object_acl("DELETE", collection, id, permission, "user", username)
    }

    pub fn grant_role_access_to_object(
        &self,
        collection: &str,
        id: &str,
        permission: Permission,
        role: &str,
    ) -> Result<(), Error> {
        self.object_acl("PUT", collection, id, permission, "role", role)
    }

    pub fn revoke_role_access_to_object(
        &self,
        collection: &str,
        id: &str,
        permission: Permission,
        role: &str,
    ) -> Result<(), Error> {
        self.object_acl("DELETE", collection, id, permission, "role", role)
    }

    fn object_acl(
        &self,
        method: &str,
        collection: &str,
        id: &str,
        permission: Permission,
        target_kind: &str,
        target: &str,
    ) -> Result<(), Error> {
        let url = self.url(&[
            "document",
            collection,
            id,
            permission.as_str(),
            target_kind,
            target,
        ])?;
        let _: Value = self.request_json::<(), Value>(method, &url, None)?;
        Ok(())
    }
}

fn object_id(object: &Value) -> Option<&str> {
    object.get("id").and_then(Value::as_str)
}

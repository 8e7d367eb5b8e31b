//! Device inventory endpoints: plain CRUD over the authenticated client.

use fleetline_api_models::{Device, DevicePayload};
use uuid::Uuid;

use crate::error::ClientResult;
use crate::http::ApiClient;

const DEVICES_PATH: &str = "/api/devices";
const DEVICES_CREATE_PATH: &str = "/api/devices/create";

/// Typed wrapper for the device inventory endpoints.
#[derive(Debug, Clone)]
pub struct DeviceService {
    client: ApiClient,
}

impl DeviceService {
    /// Service over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the full device inventory.
    ///
    /// # Errors
    ///
    /// Propagates request failures per the [`crate::ClientError`] taxonomy.
    pub async fn list(&self) -> ClientResult<Vec<Device>> {
        self.client.get_json(DEVICES_PATH).await
    }

    /// Register a new device and return the created record.
    ///
    /// # Errors
    ///
    /// Propagates request failures per the [`crate::ClientError`] taxonomy.
    pub async fn create(&self, payload: &DevicePayload) -> ClientResult<Device> {
        self.client.post_json(DEVICES_CREATE_PATH, payload).await
    }

    /// Replace the record of an existing device.
    ///
    /// # Errors
    ///
    /// Propagates request failures per the [`crate::ClientError`] taxonomy.
    pub async fn update(&self, device_guid: Uuid, payload: &DevicePayload) -> ClientResult<Device> {
        self.client
            .put_json(&format!("{DEVICES_PATH}/{device_guid}"), payload)
            .await
    }

    /// Remove a device from the inventory.
    ///
    /// # Errors
    ///
    /// Propagates request failures per the [`crate::ClientError`] taxonomy.
    pub async fn remove(&self, device_guid: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("{DEVICES_PATH}/{device_guid}"))
            .await
    }
}

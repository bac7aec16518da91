// REST client for a Firebase-style realtime database: GET/PUT <base>/<path>.json?auth=<token>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{DeviceStore, parse_device_tree};
use crate::error::StoreError;
use crate::models::{Device, SensorReading, ValveStatus};

pub struct RtdbClient {
    http: Client,
    base_url: String,
    uid: String,
    auth_token: Option<String>,
}

impl RtdbClient {
    pub fn new(
        base_url: &str,
        uid: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(concat!("farmwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            uid: uid.to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    /// `devices` or `devices/<id>/<node>` under the user's tree.
    fn url(&self, path: &str) -> String {
        format!("{}/users/{}/{}.json", self.base_url, self.uid, path)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.query(&[("auth", token)]),
            None => req,
        }
    }

    /// GET a node; 404 and JSON `null` are both `NotFound`.
    async fn get_node(&self, path: &str) -> Result<serde_json::Value, StoreError> {
        let response = self.with_auth(self.http.get(self.url(path))).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound {
                    path: path.to_string(),
                });
            }
            s if !s.is_success() => return Err(StoreError::Status { status: s.as_u16() }),
            _ => {}
        }
        let value: serde_json::Value = response.json().await?;
        if value.is_null() {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(value)
    }

    async fn put_node<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), StoreError> {
        let response = self
            .with_auth(self.http.put(self.url(path)))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for RtdbClient {
    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        match self.get_node("devices").await {
            Ok(tree) => parse_device_tree(&tree),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn fetch_sensor_data(&self, device_id: &str) -> Result<SensorReading, StoreError> {
        let node = self
            .get_node(&format!("devices/{device_id}/sensor_data"))
            .await?;
        Ok(serde_json::from_value(node)?)
    }

    async fn fetch_camera_feeds(&self, device_id: &str) -> Result<serde_json::Value, StoreError> {
        match self
            .get_node(&format!("devices/{device_id}/camera_feeds"))
            .await
        {
            Ok(v) => Ok(v),
            Err(StoreError::NotFound { .. }) => Ok(serde_json::json!({})),
            Err(e) => Err(e),
        }
    }

    async fn read_valve_status(&self, device_id: &str) -> Result<Option<String>, StoreError> {
        match self
            .get_node(&format!("devices/{device_id}/valve_control/valveStatus"))
            .await
        {
            Ok(serde_json::Value::String(s)) => Ok(Some(s)),
            Ok(other) => Ok(Some(other.to_string())),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_valve_status(
        &self,
        device_id: &str,
        status: ValveStatus,
    ) -> Result<(), StoreError> {
        self.put_node(
            &format!("devices/{device_id}/valve_control/valveStatus"),
            status.as_str(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceType;
    use mockito::{Matcher, Server};

    fn client(base_url: String, token: Option<&str>) -> RtdbClient {
        RtdbClient::new(
            &base_url,
            "u1",
            token.map(String::from),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_devices_parses_device_info() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "esp32_a1": {
                        "device_info": {"name": "North bed", "zone": "Zone A", "type": "sensor"},
                        "sensor_data": {"moisture": 40}
                    },
                    "pi_cam": {"device_info": {"zone": "Zone B"}},
                    "unclaimed": {"sensor_data": {"moisture": 1}}
                }"#,
            )
            .create_async()
            .await;

        let devices = client(server.url(), None).list_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device_id, "esp32_a1");
        assert_eq!(devices[0].name, "North bed");
        assert_eq!(devices[0].zone, "Zone A");
        assert_eq!(devices[0].device_type, DeviceType::Sensor);
        assert!(devices[0].sensor_data.is_none());
        assert_eq!(devices[1].device_type, DeviceType::CameraServer);
        assert_eq!(devices[1].name, "pi_cam");
    }

    #[tokio::test]
    async fn test_list_devices_null_tree_is_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices.json")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let devices = client(server.url(), None).list_devices().await.unwrap();
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_sensor_data_sends_auth_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices/esp32_a1/sensor_data.json")
            .match_query(Matcher::UrlEncoded("auth".into(), "tok".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"moisture": 42.5, "temperature": 27, "humidity": 80}"#)
            .create_async()
            .await;

        let reading = client(server.url(), Some("tok"))
            .fetch_sensor_data("esp32_a1")
            .await
            .unwrap();

        assert_eq!(reading.moisture, Some(42.5));
        assert_eq!(reading.temperature, Some(27.0));
        assert_eq!(reading.ph, None);
        assert!(reading.extra.contains_key("humidity"));
    }

    #[tokio::test]
    async fn test_fetch_sensor_data_404_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices/esp32_a1/sensor_data.json")
            .with_status(404)
            .create_async()
            .await;

        let err = client(server.url(), None)
            .fetch_sensor_data("esp32_a1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_sensor_data_server_error_is_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices/esp32_a1/sensor_data.json")
            .with_status(503)
            .create_async()
            .await;

        let err = client(server.url(), None)
            .fetch_sensor_data("esp32_a1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_write_valve_status_puts_json_string() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/users/u1/devices/esp32_v1/valve_control/valveStatus.json")
            .match_body("\"ON\"")
            .with_status(200)
            .with_body("\"ON\"")
            .create_async()
            .await;

        client(server.url(), None)
            .write_valve_status("esp32_v1", ValveStatus::On)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_valve_status_missing_is_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/u1/devices/esp32_v1/valve_control/valveStatus.json")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let status = client(server.url(), None)
            .read_valve_status("esp32_v1")
            .await
            .unwrap();
        assert_eq!(status, None);
    }
}

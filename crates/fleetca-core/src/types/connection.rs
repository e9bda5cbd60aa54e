use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::EndpointDescriptor;

/// Default HTTPS port for device publish requests
pub const DEFAULT_DEVICE_PORT: u16 = 8443;

/// Everything a device needs to open its first mutual-TLS connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Device identifier (certificate CN)
    pub device_id: String,

    /// Registry data-plane endpoint
    pub endpoint: EndpointDescriptor,

    /// TLS port on the endpoint
    pub port: u16,

    /// Publish topic for this device
    pub topic: String,

    /// Trust root the device should pin
    pub ca_path: PathBuf,

    /// Device certificate
    pub cert_path: PathBuf,

    /// Device private key
    pub key_path: PathBuf,
}

impl ConnectionDescriptor {
    /// HTTPS publish URL for the device topic
    #[must_use]
    pub fn publish_url(&self) -> String {
        format!(
            "https://{}:{}/topics/{}",
            self.endpoint.address, self.port, self.topic
        )
    }

    /// A `curl` invocation that publishes a hello message as the device
    #[must_use]
    pub fn curl_command(&self) -> String {
        format!(
            "curl --tlsv1.2 --cacert {} --cert {} --key {} -X POST -d '{{ \"message\": \"Hello, from test device : {}\" }}' \"{}\"",
            self.ca_path.display(),
            self.cert_path.display(),
            self.key_path.display(),
            self.device_id,
            self.publish_url()
        )
    }
}

//! Authenticated session against the vSphere VI/JSON endpoint
//! (`https://<host>/sdk/vim25/<release>/...`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    ConnectError, CustomFieldDef, InventoryService, ManagedObjectReference, PropertyFilterSpec,
    RetrieveResult, VsphereError,
};

pub const SESSION_HEADER: &str = "vmware-api-session-id";

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Host name, `host:port` or a full `https://` URL
    pub host: String,
    pub username: String,
    pub password: String,
    pub ignore_ssl: bool,
    pub api_release: String,
    pub timeout: Duration,
}

/// Managers advertised by the service instance.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    #[serde(default)]
    pub view_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub custom_fields_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub session_manager: Option<ManagedObjectReference>,
    #[serde(default)]
    pub about: Option<AboutInfo>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub full_name: String,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct FaultBody {
    #[serde(rename = "_typeName")]
    type_name: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(rename = "faultMessage", default)]
    fault_message: Vec<LocalizableMessage>,
}

#[derive(Deserialize, Debug)]
struct LocalizableMessage {
    #[serde(default)]
    message: Option<String>,
}

impl FaultBody {
    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.fault_message.iter().find_map(|m| m.message.clone()))
            .unwrap_or_default()
    }
}

/// Turns an unsuccessful response into a [`VsphereError`], preferring the
/// vim fault carried in the body when there is one.
fn error_from_body(method: &str, status: u16, body: &str) -> VsphereError {
    match serde_json::from_str::<FaultBody>(body) {
        Ok(fault) => VsphereError::Fault {
            method: method.to_owned(),
            message: fault.message(),
            fault: fault.type_name,
        },
        Err(_) => VsphereError::Http {
            method: method.to_owned(),
            status,
            body: body.to_owned(),
        },
    }
}

fn endpoint_base(host: &str, api_release: &str) -> Result<Url, VsphereError> {
    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_owned()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    };

    let mut url = Url::parse(&raw).map_err(|_| VsphereError::InvalidUrl(raw.clone()))?;
    url.path_segments_mut()
        .map_err(|_| VsphereError::InvalidUrl(raw.clone()))?
        .pop_if_empty()
        .extend(["sdk", "vim25", api_release]);
    Ok(url)
}

pub struct Session {
    client: Client,
    base: Url,
    session_id: String,
    content: ServiceContent,
}

/// Logs in to vCenter.
///
/// Every failure is folded into one of the three [`ConnectError`] kinds;
/// callers treat all of them as "no session".
pub async fn connect(options: &ConnectOptions) -> Result<Session, ConnectError> {
    let client = Client::builder()
        .danger_accept_invalid_certs(options.ignore_ssl)
        .timeout(options.timeout)
        .build()
        .map_err(|e| ConnectError::Unknown(e.to_string()))?;

    let base = endpoint_base(&options.host, &options.api_release)?;
    Ok(Session::login(client, base, options).await?)
}

impl Session {
    async fn login(
        client: Client,
        base: Url,
        options: &ConnectOptions,
    ) -> Result<Self, VsphereError> {
        let content_url = endpoint(&base, "ServiceInstance", "ServiceInstance", "content")?;
        let response = send("RetrieveServiceContent", client.get(content_url)).await?;
        let content: ServiceContent = decode(response, "RetrieveServiceContent").await?;

        let manager = required_manager("sessionManager", &content.session_manager)?;
        let login_url = endpoint(&base, &manager.kind, &manager.value, "Login")?;
        let response = send(
            "Login",
            client.post(login_url).json(&LoginRequest {
                user_name: &options.username,
                password: &options.password,
            }),
        )
        .await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(VsphereError::MissingSessionId)?;

        match &content.about {
            Some(about) => info!("Connected to {}", about.full_name),
            None => info!("Connected to {}", base),
        }

        Ok(Session {
            client,
            base,
            session_id,
            content,
        })
    }

    pub fn content(&self) -> &ServiceContent {
        &self.content
    }

    /// Ends the server-side session. Failures are only logged.
    pub async fn logout(self) {
        let result = async {
            let manager = required_manager("sessionManager", &self.content.session_manager)?;
            let url = self.url(&manager.kind, &manager.value, "Logout")?;
            send("Logout", self.authed(self.client.post(url))).await
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to log out of vCenter: {e}");
        }
    }

    fn url(&self, kind: &str, id: &str, method: &str) -> Result<Url, VsphereError> {
        endpoint(&self.base, kind, id, method)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(SESSION_HEADER, &self.session_id)
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        method: &str,
        target: &ManagedObjectReference,
        body: Option<Value>,
    ) -> Result<Option<T>, VsphereError> {
        let url = self.url(&target.kind, &target.value, method)?;
        let mut request = self.authed(self.client.post(url));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = send(method, request).await?;
        decode_optional(response, method).await
    }
}

fn required_manager<'a>(
    name: &'static str,
    manager: &'a Option<ManagedObjectReference>,
) -> Result<&'a ManagedObjectReference, VsphereError> {
    manager.as_ref().ok_or(VsphereError::MissingManager(name))
}

/// `<base>/<kind>/<id>/<method>`, with each segment percent-encoded
/// (container view ids contain brackets).
fn endpoint(base: &Url, kind: &str, id: &str, method: &str) -> Result<Url, VsphereError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| VsphereError::InvalidUrl(base.to_string()))?
        .extend([kind, id, method]);
    Ok(url)
}

async fn send(method: &str, request: RequestBuilder) -> Result<Response, VsphereError> {
    debug!("invoking {method}");
    let response = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| VsphereError::Request {
            method: method.to_owned(),
            source,
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(method, status.as_u16(), &body))
}

async fn read_text(response: Response, method: &str) -> Result<String, VsphereError> {
    response.text().await.map_err(|source| VsphereError::Request {
        method: method.to_owned(),
        source,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, method: &str) -> Result<T, VsphereError> {
    decode_optional(response, method)
        .await?
        .ok_or_else(|| VsphereError::EmptyResponse {
            method: method.to_owned(),
        })
}

/// Methods without a result answer `204` or an empty body.
async fn decode_optional<T: DeserializeOwned>(
    response: Response,
    method: &str,
) -> Result<Option<T>, VsphereError> {
    let text = read_text(response, method).await?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<Option<T>>(&text).map_err(|source| VsphereError::Decode {
        method: method.to_owned(),
        source,
    })
}

#[async_trait]
impl InventoryService for Session {
    async fn create_container_view(
        &self,
        kind: &str,
    ) -> Result<ManagedObjectReference, VsphereError> {
        let view_manager = required_manager("viewManager", &self.content.view_manager)?;
        let body = json!({
            "container": self.content.root_folder,
            "type": [kind],
            "recursive": true,
        });

        self.invoke("CreateContainerView", view_manager, Some(body))
            .await?
            .ok_or_else(|| VsphereError::EmptyResponse {
                method: "CreateContainerView".to_owned(),
            })
    }

    async fn retrieve_properties(
        &self,
        spec: &PropertyFilterSpec,
    ) -> Result<Option<RetrieveResult>, VsphereError> {
        let body = json!({
            "specSet": [spec],
            "options": { "_typeName": "RetrieveOptions" },
        });
        self.invoke("RetrievePropertiesEx", &self.content.property_collector, Some(body))
            .await
    }

    async fn continue_retrieve_properties(
        &self,
        token: &str,
    ) -> Result<Option<RetrieveResult>, VsphereError> {
        self.invoke(
            "ContinueRetrievePropertiesEx",
            &self.content.property_collector,
            Some(json!({ "token": token })),
        )
        .await
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VsphereError> {
        self.invoke::<Value>("DestroyView", view, None).await?;
        Ok(())
    }

    async fn custom_field_definitions(&self) -> Result<Vec<CustomFieldDef>, VsphereError> {
        let Some(manager) = &self.content.custom_fields_manager else {
            return Ok(Vec::new());
        };

        let url = self.url(&manager.kind, &manager.value, "field")?;
        let response = send("CustomFieldsManager.field", self.authed(self.client.get(url))).await?;
        Ok(decode_optional(response, "CustomFieldsManager.field")
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_connect_without_verification_reports_transport_failure() {
        let options = ConnectOptions {
            host: "127.0.0.1:1".to_owned(),
            username: "root".to_owned(),
            password: "secret".to_owned(),
            ignore_ssl: true,
            api_release: "8.0.1.0".to_owned(),
            timeout: Duration::from_secs(5),
        };

        match connect(&options).await {
            Err(ConnectError::Transport(message)) => {
                assert!(message.contains("RetrieveServiceContent"))
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connected to a closed port"),
        }
    }

    #[test]
    fn test_endpoint_base_from_hostname() {
        let url = endpoint_base("vc01.lab.local", "8.0.1.0").unwrap();
        assert_eq!(url.as_str(), "https://vc01.lab.local/sdk/vim25/8.0.1.0");
    }

    #[test]
    fn test_endpoint_base_keeps_scheme_and_port() {
        let url = endpoint_base("https://10.0.0.5:8443/", "8.0.2.0").unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.5:8443/sdk/vim25/8.0.2.0");
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        assert!(matches!(
            endpoint_base("https://", "8.0.1.0"),
            Err(VsphereError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_fault_body_becomes_fault() {
        let body = r#"{"_typeName":"InvalidLogin","faultMessage":[{"_typeName":"LocalizableMessage","key":"k","message":"Cannot complete login due to an incorrect user name or password."}]}"#;

        match error_from_body("Login", 500, body) {
            VsphereError::Fault { fault, message, .. } => {
                assert_eq!(fault, "InvalidLogin");
                assert_eq!(
                    message,
                    "Cannot complete login due to an incorrect user name or password."
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plain_body_becomes_http_error() {
        assert!(matches!(
            error_from_body("Login", 503, "<html>Service Unavailable</html>"),
            VsphereError::Http { status: 503, .. }
        ));
    }
}

use inquire::{Password, PasswordDisplayMode, Text};
use models::EsxiEntry;
use settings::VCenterConfig;

use crate::prelude::InventoryError;

/// Source of interactive answers. The terminal implementation is
/// [`InquirePrompter`]; tests feed canned answers.
pub trait Prompter {
    fn text(&mut self, message: &str) -> Result<String, InventoryError>;

    /// Reads a secret without echoing it.
    fn password(&mut self, message: &str) -> Result<String, InventoryError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn text(&mut self, message: &str) -> Result<String, InventoryError> {
        Ok(Text::new(message).prompt()?)
    }

    fn password(&mut self, message: &str) -> Result<String, InventoryError> {
        Ok(Password::new(message)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?)
    }
}

pub fn prompt_esxi_entry(prompter: &mut dyn Prompter) -> Result<EsxiEntry, InventoryError> {
    let rack_id = prompter.text("Enter Rack ID: ")?;
    let esxi_ip = prompter.text("Enter ESXI IP: ")?;
    let rack_units =
        prompter.text("Enter Rack Unit (comma-separated for multiple, e.g., U1,U2): ")?;
    let ilo_address = prompter.text("Enter ILO Address: ")?;

    Ok(EsxiEntry::from_input(
        &rack_id,
        &esxi_ip,
        &rack_units,
        &ilo_address,
    ))
}

/// vCenter login details. Host and username come from the config when set.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

pub fn prompt_credentials(
    prompter: &mut dyn Prompter,
    vcenter: &VCenterConfig,
) -> Result<Credentials, InventoryError> {
    let host = match &vcenter.host {
        Some(host) => host.clone(),
        None => prompter.text("Enter vCenter hostname/IP: ")?,
    };
    let username = match &vcenter.username {
        Some(username) => username.clone(),
        None => prompter.text("Enter username: ")?,
    };
    let password = prompter.password("Enter password: ")?;

    Ok(Credentials {
        host: host.trim().to_owned(),
        username: username.trim().to_owned(),
        password,
    })
}

/// Answers prompts from a fixed list and records the questions asked.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            answers: answers.into_iter().map(str::to_owned).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> Result<String, InventoryError> {
        self.asked.push(message.to_owned());
        self.answers
            .pop_front()
            .ok_or(InventoryError::Prompt(inquire::InquireError::OperationCanceled))
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn text(&mut self, message: &str) -> Result<String, InventoryError> {
        self.next(message)
    }

    fn password(&mut self, message: &str) -> Result<String, InventoryError> {
        self.next(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_esxi_entry_is_normalized() {
        let mut prompter = ScriptedPrompter::new(["r1", "10.0.0.1", "u1, u2", "ilo-a"]);
        let entry = prompt_esxi_entry(&mut prompter).unwrap();

        assert_eq!(entry.rack_id, "R1");
        assert_eq!(entry.esxi_ip, "10.0.0.1");
        assert_eq!(entry.rack_units, vec!["U1", "U2"]);
        assert_eq!(entry.ilo_address, "ILO-A");
        assert_eq!(prompter.asked.len(), 4);
    }

    #[test]
    fn test_configured_host_is_not_prompted() {
        let vcenter = VCenterConfig {
            host: Some("vc01.lab.local".to_owned()),
            ..VCenterConfig::default()
        };
        let mut prompter = ScriptedPrompter::new(["administrator@vsphere.local", "secret"]);

        let creds = prompt_credentials(&mut prompter, &vcenter).unwrap();

        assert_eq!(creds.host, "vc01.lab.local");
        assert_eq!(creds.username, "administrator@vsphere.local");
        assert_eq!(creds.password, "secret");
        assert_eq!(prompter.asked, vec!["Enter username: ", "Enter password: "]);
    }

    #[test]
    fn test_exhausted_input_is_an_error() {
        let mut prompter = ScriptedPrompter::new(["r1"]);
        assert!(matches!(
            prompt_esxi_entry(&mut prompter),
            Err(InventoryError::Prompt(_))
        ));
    }
}

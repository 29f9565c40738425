//! Command identifier grammar
//!
//! Hosting integrations address device features through opaque identifier
//! strings (`set_source_HDMI_1`, `set_hdcp_14`, ...). The identifier is
//! decoded exactly once at the controller boundary into a `DeviceCommand`,
//! so dispatch is exhaustive instead of repeated prefix matching.

use crate::models::ModelCapability;

/// A decoded device command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Select an input by its human-facing name ("HDMI 1", "Top")
    SelectSource(String),
    /// Set the EDID synthesis mode
    EdidMode(String),
    /// Set the EDID audio source
    EdidAudio(String),
    /// Toggle custom HDR metadata injection
    HdrCustom(bool),
    /// Toggle HDR metadata stripping
    HdrDisable(bool),
    /// Toggle the CEC engine
    Cec(bool),
    /// Set the eARC force mode
    EarcForce(String),
    /// Toggle the front OLED display
    Oled(bool),
    /// Toggle input autoswitching
    Autoswitch(bool),
    /// Set the HDCP output mode
    HdcpMode(String),
    /// Set the scaler mode
    ScaleMode(String),
    /// Set the audio routing mode
    AudioMode(String),
    /// Set the Ambilight LED profile video mode
    LedProfileVideo(String),
}

impl DeviceCommand {
    /// Decode a command identifier
    ///
    /// Prefix-dispatched, case-sensitive, `_`-delimited after the prefix.
    /// Returns `None` for identifiers outside the grammar.
    pub fn parse(id: &str) -> Option<Self> {
        if let Some(rest) = id.strip_prefix("set_source_") {
            return Some(Self::SelectSource(rest.replace('_', " ")));
        }
        if let Some(rest) = id.strip_prefix("set_edidmode_") {
            return Some(Self::EdidMode(rest.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_edidaudio_") {
            // Identifiers carry "51" because dots are not valid in ids.
            let source = if rest == "51" { "5.1" } else { rest };
            return Some(Self::EdidAudio(source.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_hdrcustom_") {
            return Some(Self::HdrCustom(rest == "on"));
        }
        if let Some(rest) = id.strip_prefix("set_hdrdisable_") {
            return Some(Self::HdrDisable(rest == "on"));
        }
        if let Some(rest) = id.strip_prefix("set_cec_") {
            return Some(Self::Cec(rest == "on"));
        }
        if let Some(rest) = id.strip_prefix("set_earcforce_") {
            return Some(Self::EarcForce(rest.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_oled_") {
            return Some(Self::Oled(rest == "on"));
        }
        if let Some(rest) = id.strip_prefix("set_autosw_") {
            return Some(Self::Autoswitch(rest == "on"));
        }
        if let Some(rest) = id.strip_prefix("set_hdcp_") {
            return Some(Self::HdcpMode(rest.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_scalemode_") {
            return Some(Self::ScaleMode(rest.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_audiomode_") {
            return Some(Self::AudioMode(rest.to_string()));
        }
        if let Some(rest) = id.strip_prefix("set_ledprofilevideo_") {
            return Some(Self::LedProfileVideo(rest.to_string()));
        }
        None
    }
}

/// Build the full list of command identifiers a model supports
///
/// Hosting integrations use this for activity mapping; every returned
/// identifier round-trips through [`DeviceCommand::parse`].
pub fn simple_command_ids(capability: &ModelCapability) -> Vec<String> {
    let mut commands = Vec::new();

    if capability.has_inputs() {
        for source in capability.source_list() {
            commands.push(format!("set_source_{}", source.replace(' ', "_")));
        }
    }

    for mode in capability.edid_modes {
        commands.push(format!("set_edidmode_{}", mode));
    }

    for source in capability.edid_audio_sources {
        commands.push(format!("set_edidaudio_{}", source.replace('.', "")));
    }

    for mode in capability.scale_modes {
        commands.push(format!("set_scalemode_{}", mode));
    }

    for mode in capability.audio_modes {
        commands.push(format!("set_audiomode_{}", mode));
    }

    for mode in capability.led_modes {
        commands.push(format!("set_ledprofilevideo_{}", mode));
    }

    if capability.hdr_custom_support {
        commands.push("set_hdrcustom_on".to_string());
        commands.push("set_hdrcustom_off".to_string());
    }

    if capability.hdr_disable_support {
        commands.push("set_hdrdisable_on".to_string());
        commands.push("set_hdrdisable_off".to_string());
    }

    if capability.cec_support {
        commands.push("set_cec_on".to_string());
        commands.push("set_cec_off".to_string());
    }

    for mode in capability.earc_force_modes {
        commands.push(format!("set_earcforce_{}", mode));
    }

    if capability.oled_support {
        commands.push("set_oled_on".to_string());
        commands.push("set_oled_off".to_string());
    }

    if capability.autoswitch_support {
        commands.push("set_autosw_on".to_string());
        commands.push("set_autosw_off".to_string());
    }

    for mode in capability.hdcp_modes {
        let encoded = if *mode == "1.4" { "14" } else { mode };
        commands.push(format!("set_hdcp_{}", encoded));
    }

    commands
}

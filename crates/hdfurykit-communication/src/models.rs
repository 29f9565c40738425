//! HDFury model capability tables
//!
//! Each supported unit family gets one static `ModelCapability` describing
//! its default port, input layout, and command vocabularies. The tables are
//! created once at startup and live for the process lifetime.

/// Immutable per-model capability descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapability {
    /// Stable model identifier ("vrroom", "vertex", ...)
    pub model_id: &'static str,
    /// Marketing name shown to users
    pub display_name: &'static str,
    /// TCP port the unit listens on out of the box
    pub default_port: u16,
    /// Number of HDMI inputs (0 for pass-through devices)
    pub input_count: u8,
    /// Verb used for source selection (empty when not selectable)
    pub source_command: &'static str,
    /// EDID synthesis modes
    pub edid_modes: &'static [&'static str],
    /// EDID audio source options
    pub edid_audio_sources: &'static [&'static str],
    /// Supports custom HDR metadata injection
    pub hdr_custom_support: bool,
    /// Supports stripping HDR metadata
    pub hdr_disable_support: bool,
    /// Has a CEC engine
    pub cec_support: bool,
    /// eARC force modes (empty when auto-only)
    pub earc_force_modes: &'static [&'static str],
    /// Has a front OLED display
    pub oled_support: bool,
    /// Supports input autoswitching
    pub autoswitch_support: bool,
    /// HDCP output modes
    pub hdcp_modes: &'static [&'static str],
    /// Scaler modes (empty when the unit has no scaler)
    pub scale_modes: &'static [&'static str],
    /// Audio routing modes
    pub audio_modes: &'static [&'static str],
    /// Ambilight LED profile modes
    pub led_modes: &'static [&'static str],
}

impl ModelCapability {
    /// True when the unit has selectable inputs
    pub fn has_inputs(&self) -> bool {
        self.input_count > 0
    }

    /// Human-facing source names for this model
    ///
    /// Two-input units use Top/Bottom naming; matrix units use HDMI 0..n-1.
    pub fn source_list(&self) -> Vec<String> {
        match self.input_count {
            0 => Vec::new(),
            2 => vec!["Top".to_string(), "Bottom".to_string()],
            n => (0..n).map(|i| format!("HDMI {}", i)).collect(),
        }
    }

    /// Translate a human-facing source name into the wire argument
    pub fn format_source(&self, source: &str) -> String {
        if self.model_id == "vertex" {
            match source {
                "Bottom" => "bot".to_string(),
                _ => "top".to_string(),
            }
        } else {
            source.replace("HDMI ", "").trim().to_string()
        }
    }
}

/// VRRoom: 4-input 8K matrix
pub static VRROOM: ModelCapability = ModelCapability {
    model_id: "vrroom",
    display_name: "VRRooM",
    default_port: 2222,
    input_count: 4,
    source_command: "inseltx0",
    edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
    edid_audio_sources: &["stereo", "5.1", "full", "audioout", "earcout"],
    hdr_custom_support: true,
    hdr_disable_support: true,
    cec_support: true,
    earc_force_modes: &["auto", "earc", "hdmi"],
    oled_support: true,
    autoswitch_support: true,
    hdcp_modes: &["auto", "1.4"],
    scale_modes: &[],
    audio_modes: &[],
    led_modes: &[],
};

/// Vertex2: 4-input 4K matrix with scaler
pub static VERTEX2: ModelCapability = ModelCapability {
    model_id: "vertex2",
    display_name: "VERTEX2",
    default_port: 2220,
    input_count: 4,
    source_command: "inseltx0",
    edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
    edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
    hdr_custom_support: true,
    hdr_disable_support: true,
    cec_support: true,
    earc_force_modes: &["auto", "earc", "hdmi"],
    oled_support: true,
    autoswitch_support: true,
    hdcp_modes: &["auto", "1.4"],
    scale_modes: &["auto", "custom", "none"],
    audio_modes: &[],
    led_modes: &[],
};

/// Vertex: 2-input splitter, uses the legacy `input` verb
pub static VERTEX: ModelCapability = ModelCapability {
    model_id: "vertex",
    display_name: "VERTEX",
    default_port: 2220,
    input_count: 2,
    source_command: "input",
    edid_modes: &["automix", "custom", "fixed", "copytop", "copybot"],
    edid_audio_sources: &["stereo", "5.1", "7.1", "native", "top"],
    hdr_custom_support: true,
    hdr_disable_support: true,
    cec_support: true,
    earc_force_modes: &[],
    oled_support: true,
    autoswitch_support: true,
    hdcp_modes: &["1.4", "2.2"],
    scale_modes: &["auto", "custom", "none"],
    audio_modes: &[],
    led_modes: &[],
};

/// Diva: 4-input matrix with Ambilight LED output
pub static DIVA: ModelCapability = ModelCapability {
    model_id: "diva",
    display_name: "DIVA",
    default_port: 2210,
    input_count: 4,
    source_command: "inseltx0",
    edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
    edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
    hdr_custom_support: true,
    hdr_disable_support: true,
    cec_support: true,
    earc_force_modes: &["auto", "earc", "hdmi"],
    oled_support: true,
    autoswitch_support: true,
    hdcp_modes: &["auto", "1.4"],
    scale_modes: &["auto", "custom", "none"],
    audio_modes: &[],
    led_modes: &["0", "1", "2", "3", "4"],
};

/// Maestro: 4-input matrix
pub static MAESTRO: ModelCapability = ModelCapability {
    model_id: "maestro",
    display_name: "Maestro",
    default_port: 2200,
    input_count: 4,
    source_command: "inseltx0",
    edid_modes: &["automix", "custom", "fixed", "copytx0", "copytx1"],
    edid_audio_sources: &["stereo", "5.1", "full", "native", "tx1"],
    hdr_custom_support: true,
    hdr_disable_support: true,
    cec_support: true,
    earc_force_modes: &["auto", "earc", "hdmi"],
    oled_support: true,
    autoswitch_support: true,
    hdcp_modes: &["auto", "1.4"],
    scale_modes: &["auto", "custom", "none"],
    audio_modes: &[],
    led_modes: &[],
};

/// Arcana2: single-input eARC adapter with its own scaler verb
pub static ARCANA2: ModelCapability = ModelCapability {
    model_id: "arcana2",
    display_name: "ARCANA2",
    default_port: 2222,
    input_count: 1,
    source_command: "",
    edid_modes: &[],
    edid_audio_sources: &[],
    hdr_custom_support: true,
    hdr_disable_support: false,
    cec_support: false,
    earc_force_modes: &["autoearc", "manualearc", "autoarc", "manualarc", "hdmi"],
    oled_support: true,
    autoswitch_support: false,
    hdcp_modes: &[],
    scale_modes: &[
        "none",
        "downtx1",
        "frltmds",
        "audioonly",
        "4k60_444_8_lldv",
        "4k60_444_8_hdr",
        "4k60_444_8_sdr",
    ],
    audio_modes: &["display", "earc", "both"],
    led_modes: &[],
};

/// Dr.HDMI 8K: single-input EDID fixer
pub static DR8K: ModelCapability = ModelCapability {
    model_id: "dr8k",
    display_name: "Dr.HDMI 8K",
    default_port: 2201,
    input_count: 1,
    source_command: "",
    edid_modes: &["automix", "custom", "fixed", "copytx"],
    edid_audio_sources: &["stereo", "5.1", "full", "custom"],
    hdr_custom_support: false,
    hdr_disable_support: false,
    cec_support: false,
    earc_force_modes: &[],
    oled_support: true,
    autoswitch_support: false,
    hdcp_modes: &[],
    scale_modes: &[],
    audio_modes: &[],
    led_modes: &[],
};

/// All known capability tables
pub static MODELS: &[&ModelCapability] = &[
    &VRROOM, &VERTEX2, &VERTEX, &DIVA, &MAESTRO, &ARCANA2, &DR8K,
];

/// Look up the capability table for a model id
///
/// Unknown ids fall back to the VRRoom capability set.
pub fn capability_for(model_id: &str) -> &'static ModelCapability {
    MODELS
        .iter()
        .copied()
        .find(|m| m.model_id == model_id)
        .unwrap_or(&VRROOM)
}

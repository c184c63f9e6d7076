//! EK80 XML0 datagrams: configuration, per-ping parameters, and environment.
//!
//! Attributes are flattened through declared attribute maps. Each entry names
//! the XML attribute, the flattened field name, the value type, and an optional
//! list delimiter. The configuration datagram keeps its source document so
//! encoding can patch known fields back into it and leave the rest untouched.

use crate::cursor::{strip_nuls, PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::error::DatagramError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

fn xml_err(e: impl std::fmt::Display) -> DatagramError {
    DatagramError::Xml(e.to_string())
}

// ─── Element Tree ───────────────────────────────────────────────────────────

/// Minimal element tree. Attribute order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Self, DatagramError> {
        let mut el = Self::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        for attr in e.attributes() {
            let attr = attr.map_err(xml_err)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_err)?.into_owned();
            el.attributes.push((key, value));
        }
        Ok(el)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute value, appending the attribute if absent.
    pub fn set_attr(&mut self, key: &str, value: String) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Return the named child, creating it if needed.
    pub fn child_or_insert(&mut self, name: &str) -> &mut Element {
        let idx = match self.children.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                self.children.push(Element::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// This element and every descendant with the given name, document order.
    pub fn descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for c in &self.children {
            c.descendants(name, out);
        }
    }

    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.descendants(name, &mut out);
        out
    }
}

/// Parse a UTF-8 document into its root element.
pub fn parse_document(text: &str) -> Result<Element, DatagramError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(el),
            None => {
                if root.is_none() {
                    *root = Some(el);
                }
            }
        }
    }

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => stack.push(Element::from_start(&e)?),
            Event::Empty(e) => {
                let el = Element::from_start(&e)?;
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| DatagramError::Xml("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, el);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DatagramError::Xml(format!(
            "document ends inside <{}>",
            stack[stack.len() - 1].name
        )));
    }
    root.ok_or_else(|| DatagramError::Xml("document has no root element".into()))
}

fn write_element(w: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), DatagramError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if el.children.is_empty() && el.text.is_empty() {
        return w.write_event(Event::Empty(start)).map_err(xml_err);
    }
    w.write_event(Event::Start(start)).map_err(xml_err)?;
    if !el.text.is_empty() {
        w.write_event(Event::Text(BytesText::new(&el.text)))
            .map_err(xml_err)?;
    }
    for c in &el.children {
        write_element(w, c)?;
    }
    w.write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_err)
}

/// Serialize a root element, prefixed with the XML declaration.
pub fn write_document(root: &Element) -> Result<Vec<u8>, DatagramError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut w, root)?;
    let mut out = XML_DECLARATION.as_bytes().to_vec();
    out.extend_from_slice(&w.into_inner());
    out.push(b'\n');
    Ok(out)
}

// ─── Attribute Maps ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Int,
    Float,
}

/// One declared attribute: XML name, flattened name, type, list delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub xml_name: &'static str,
    pub name: &'static str,
    pub ty: ValueType,
    pub delimiter: Option<char>,
}

const fn text(xml_name: &'static str, name: &'static str) -> AttrSpec {
    AttrSpec { xml_name, name, ty: ValueType::Text, delimiter: None }
}

const fn int(xml_name: &'static str, name: &'static str) -> AttrSpec {
    AttrSpec { xml_name, name, ty: ValueType::Int, delimiter: None }
}

const fn float(xml_name: &'static str, name: &'static str) -> AttrSpec {
    AttrSpec { xml_name, name, ty: ValueType::Float, delimiter: None }
}

const fn float_list(xml_name: &'static str, name: &'static str) -> AttrSpec {
    AttrSpec { xml_name, name, ty: ValueType::Float, delimiter: Some(';') }
}

pub const TRANSCEIVER_ATTRS: &[AttrSpec] = &[
    text("TransceiverName", "transceiver_name"),
    text("EthernetAddress", "ethernet_address"),
    text("IPAddress", "ip_address"),
    text("Version", "transceiver_version"),
    text("TransceiverSoftwareVersion", "transceiver_software_version"),
    int("TransceiverNumber", "transceiver_number"),
    text("MarketSegment", "market_segment"),
    text("TransceiverType", "transceiver_type"),
    text("SerialNumber", "serial_number"),
    int("Impedance", "impedance"),
    int("Multiplexing", "multiplexing"),
    float("RxSampleFrequency", "rx_sample_frequency"),
];

pub const CHANNEL_ATTRS: &[AttrSpec] = &[
    text("ChannelID", "channel_id"),
    text("ChannelIdShort", "channel_id_short"),
    int("MaxTxPowerTransceiver", "max_tx_power_transceiver"),
    float_list("PulseDuration", "pulse_duration"),
    float_list("PulseDurationFM", "pulse_duration_fm"),
    text("HWChannelConfiguration", "hw_channel_configuration"),
];

pub const CHANNEL_TRANSDUCER_ATTRS: &[AttrSpec] = &[
    text("TransducerName", "transducer_name"),
    text("SerialNumber", "transducer_serial_number"),
    float("Frequency", "transducer_frequency"),
    float("FrequencyMinimum", "transducer_frequency_minimum"),
    float("FrequencyMaximum", "transducer_frequency_maximum"),
    int("BeamType", "transducer_beam_type"),
    float("EquivalentBeamAngle", "equivalent_beam_angle"),
    float_list("Gain", "gain"),
    float_list("SaCorrection", "sa_correction"),
    float("MaxTxPowerTransducer", "max_tx_power_transducer"),
    float("BeamWidthAlongship", "beam_width_alongship"),
    float("BeamWidthAthwartship", "beam_width_athwartship"),
    float("AngleSensitivityAlongship", "angle_sensitivity_alongship"),
    float("AngleSensitivityAthwartship", "angle_sensitivity_athwartship"),
    float("AngleOffsetAlongship", "angle_offset_alongship"),
    float("AngleOffsetAthwartship", "angle_offset_athwartship"),
    float("DirectivityDropAt2XBeamWidth", "directivity_drop_at_2x_beam_width"),
];

pub const INSTALLED_TRANSDUCER_ATTRS: &[AttrSpec] = &[
    text("TransducerName", "transducer_name"),
    text("TransducerMounting", "transducer_mounting"),
    text("TransducerCustomName", "transducer_custom_name"),
    text("TransducerSerialNumber", "transducer_serial_number"),
    text("TransducerOrientation", "transducer_orientation"),
    float("TransducerOffsetX", "transducer_offset_x"),
    float("TransducerOffsetY", "transducer_offset_y"),
    float("TransducerOffsetZ", "transducer_offset_z"),
    float("TransducerAlphaX", "transducer_alpha_x"),
    float("TransducerAlphaY", "transducer_alpha_y"),
    float("TransducerAlphaZ", "transducer_alpha_z"),
];

pub const HEADER_ATTRS: &[AttrSpec] = &[
    text("Copyright", "copyright"),
    text("ApplicationName", "application_name"),
    text("Version", "application_version"),
    text("FileFormatVersion", "file_format_version"),
    text("TimeBias", "time_bias"),
];

pub const ENVIRONMENT_ATTRS: &[AttrSpec] = &[
    float("Depth", "depth"),
    float("Acidity", "acidity"),
    float("Salinity", "salinity"),
    float("SoundSpeed", "sound_speed"),
    float("Temperature", "temperature"),
    float("Latitude", "latitude"),
    float_list("SoundVelocityProfile", "sound_velocity_profile"),
    text("SoundVelocitySource", "sound_velocity_source"),
    float("DropKeelOffset", "drop_keel_offset"),
    int("DropKeelOffsetIsManual", "drop_keel_offset_is_manual"),
    float("WaterLevelDraft", "water_level_draft"),
    int("WaterLevelDraftIsManual", "water_level_draft_is_manual"),
];

pub const PARAMETER_ATTRS: &[AttrSpec] = &[
    text("ChannelID", "channel_id"),
    int("ChannelMode", "channel_mode"),
    int("PulseForm", "pulse_form"),
    float("Frequency", "frequency"),
    float("FrequencyStart", "frequency_start"),
    float("FrequencyEnd", "frequency_end"),
    float("PulseDuration", "pulse_duration"),
    float("SampleInterval", "sample_interval"),
    float("TransmitPower", "transmit_power"),
    float("Slope", "slope"),
];

pub const FREQUENCY_PAR_ATTRS: &[AttrSpec] = &[
    float("Frequency", "frequency"),
    float("Gain", "gain"),
    float("Impedance", "impedance"),
    float("Phase", "phase"),
    float("BeamWidthAlongship", "beam_width_alongship"),
    float("BeamWidthAthwartship", "beam_width_athwartship"),
    float("AngleOffsetAlongship", "angle_offset_alongship"),
    float("AngleOffsetAthwartship", "angle_offset_athwartship"),
];

// ─── Flattened Values ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XmlValue {
    Int(i64),
    Float(f64),
    FloatList(Vec<f64>),
    Text(String),
}

impl XmlValue {
    /// Convert an attribute string. Values that fail conversion stay text.
    fn convert(spec: &AttrSpec, raw: &str) -> Self {
        let parsed = match (spec.ty, spec.delimiter) {
            (ValueType::Text, _) => return Self::Text(raw.to_string()),
            (ValueType::Int, None) => raw.trim().parse::<i64>().ok().map(Self::Int),
            (ValueType::Float, None) => raw.trim().parse::<f64>().ok().map(Self::Float),
            (_, Some(delim)) => raw
                .split(delim)
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .ok()
                .map(Self::FloatList),
        };
        parsed.unwrap_or_else(|| {
            log::debug!(
                "XML attribute {}={:?} is not a valid {:?}, keeping it as text",
                spec.xml_name,
                raw,
                spec.ty
            );
            Self::Text(raw.to_string())
        })
    }

    fn format(&self, delimiter: Option<char>) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::FloatList(v) => {
                let sep = delimiter.unwrap_or(';').to_string();
                v.iter()
                    .map(|x| x.to_string())
                    .collect::<Vec<_>>()
                    .join(&sep)
            }
            Self::Text(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::FloatList(v) => v.first().copied(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Flattened attributes keyed by their declared field names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XmlRecord(pub BTreeMap<String, XmlValue>);

impl XmlRecord {
    pub fn get(&self, name: &str) -> Option<&XmlValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: &str, value: XmlValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(XmlValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(XmlValue::as_f64)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(XmlValue::Int(v)) => Some(*v),
            Some(XmlValue::Float(v)) => Some(*v as i64),
            _ => None,
        }
    }

    /// A list attribute, or a scalar promoted to a one-element list.
    pub fn f64_list(&self, name: &str) -> Option<Vec<f64>> {
        match self.0.get(name)? {
            XmlValue::FloatList(v) => Some(v.clone()),
            other => other.as_f64().map(|v| vec![v]),
        }
    }

    /// Copy the declared attributes of `el` into this record.
    pub fn absorb(&mut self, el: &Element, specs: &[AttrSpec]) {
        for spec in specs {
            if let Some(raw) = el.attr(spec.xml_name) {
                self.insert(spec.name, XmlValue::convert(spec, raw));
            }
        }
    }

    /// Write the declared fields this record holds onto `el`.
    pub fn patch(&self, el: &mut Element, specs: &[AttrSpec]) {
        for spec in specs {
            if let Some(v) = self.0.get(spec.name) {
                let s = v.format(spec.delimiter);
                if !s.is_empty() {
                    el.set_attr(spec.xml_name, s);
                }
            }
        }
    }

    pub fn from_element(el: &Element, specs: &[AttrSpec]) -> Self {
        let mut rec = Self::default();
        rec.absorb(el, specs);
        rec
    }
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// Wideband calibration values for one frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPar {
    pub frequency: f64,
    pub record: XmlRecord,
}

/// One channel's merged transceiver, channel, transducer and header fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    pub channel_id: String,
    pub record: XmlRecord,
    pub wideband: Vec<FrequencyPar>,
}

impl ChannelConfiguration {
    pub fn frequency(&self) -> Option<f64> {
        self.record.f64("transducer_frequency")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlConfiguration {
    /// Channels in document order.
    pub channels: Vec<ChannelConfiguration>,
    /// Source document. Empty for configurations built in memory.
    pub raw_xml: String,
}

impl XmlConfiguration {
    pub fn channel(&self, channel_id: &str) -> Option<&ChannelConfiguration> {
        self.channels.iter().find(|c| c.channel_id == channel_id)
    }

    fn from_root(root: &Element, raw_xml: &str) -> Result<Self, DatagramError> {
        let mut installed: BTreeMap<String, &Element> = BTreeMap::new();
        if let Some(xdcrs) = root.child("Transducers") {
            for x in xdcrs.find_all("Transducer") {
                if let Some(name) = x.attr("TransducerName") {
                    installed.insert(name.to_string(), x);
                }
            }
        }
        let header = root.child("Header");

        let mut channels = Vec::new();
        if let Some(xcvrs) = root.child("Transceivers") {
            for xcvr in xcvrs.find_all("Transceiver") {
                for chan in xcvr.find_all("Channel") {
                    let channel_id = chan
                        .attr("ChannelID")
                        .ok_or_else(|| DatagramError::Xml("Channel node without ChannelID".into()))?
                        .to_string();
                    let mut record = XmlRecord::from_element(xcvr, TRANSCEIVER_ATTRS);
                    record.absorb(chan, CHANNEL_ATTRS);

                    let mut wideband = Vec::new();
                    if let Some(xdcr) = chan.child("Transducer") {
                        record.absorb(xdcr, CHANNEL_TRANSDUCER_ATTRS);
                        for fp in xdcr.children.iter().filter(|c| c.name == "FrequencyPar") {
                            let mut rec = XmlRecord::from_element(fp, FREQUENCY_PAR_ATTRS);
                            if let Some(frequency) = rec.f64("frequency") {
                                rec.0.remove("frequency");
                                wideband.push(FrequencyPar { frequency, record: rec });
                            }
                        }
                        if let Some(inst) = xdcr.attr("TransducerName").and_then(|n| installed.get(n)) {
                            record.absorb(inst, INSTALLED_TRANSDUCER_ATTRS);
                        }
                    }
                    if let Some(h) = header {
                        record.absorb(h, HEADER_ATTRS);
                    }
                    channels.push(ChannelConfiguration {
                        channel_id,
                        record,
                        wideband,
                    });
                }
            }
        }

        Ok(Self {
            channels,
            raw_xml: raw_xml.to_string(),
        })
    }

    /// Patch known fields into the retained document, or build a fresh one
    /// when there is no source document.
    fn to_root(&self) -> Result<Element, DatagramError> {
        let mut root = if self.raw_xml.trim().is_empty() {
            Element::new("Configuration")
        } else {
            parse_document(&self.raw_xml)?
        };

        if let Some(first) = self.channels.first() {
            first.record.patch(root.child_or_insert("Header"), HEADER_ATTRS);
        }

        for chan in &self.channels {
            let rec = &chan.record;
            let xcvr_name = rec.text("transceiver_name").unwrap_or_default().to_string();
            let xcvrs = root.child_or_insert("Transceivers");
            let xcvr = match xcvrs
                .children
                .iter()
                .position(|x| x.name == "Transceiver" && x.attr("TransceiverName") == Some(xcvr_name.as_str()))
            {
                Some(i) => &mut xcvrs.children[i],
                None => {
                    let mut x = Element::new("Transceiver");
                    x.set_attr("TransceiverName", xcvr_name.clone());
                    xcvrs.children.push(x);
                    let last = xcvrs.children.len() - 1;
                    &mut xcvrs.children[last]
                }
            };
            rec.patch(xcvr, TRANSCEIVER_ATTRS);

            let chans = xcvr.child_or_insert("Channels");
            let ch = match chans
                .children
                .iter()
                .position(|c| c.name == "Channel" && c.attr("ChannelID") == Some(chan.channel_id.as_str()))
            {
                Some(i) => &mut chans.children[i],
                None => {
                    let mut c = Element::new("Channel");
                    c.set_attr("ChannelID", chan.channel_id.clone());
                    chans.children.push(c);
                    let last = chans.children.len() - 1;
                    &mut chans.children[last]
                }
            };
            rec.patch(ch, CHANNEL_ATTRS);

            let xdcr_name = rec.text("transducer_name").map(str::to_string);
            let xdcr_idx = match ch.children.iter().position(|c| c.name == "Transducer") {
                Some(i) => {
                    if xdcr_name.is_some() && ch.children[i].attr("TransducerName") != xdcr_name.as_deref() {
                        continue;
                    }
                    i
                }
                None => {
                    ch.children.push(Element::new("Transducer"));
                    ch.children.len() - 1
                }
            };
            let xdcr = &mut ch.children[xdcr_idx];
            rec.patch(xdcr, CHANNEL_TRANSDUCER_ATTRS);
            for fp in &chan.wideband {
                let existing = xdcr.children.iter().position(|c| {
                    c.name == "FrequencyPar"
                        && c.attr("Frequency").and_then(|f| f.trim().parse::<f64>().ok())
                            == Some(fp.frequency)
                });
                let node = match existing {
                    Some(i) => &mut xdcr.children[i],
                    None => {
                        let mut n = Element::new("FrequencyPar");
                        n.set_attr("Frequency", fp.frequency.to_string());
                        xdcr.children.push(n);
                        let last = xdcr.children.len() - 1;
                        &mut xdcr.children[last]
                    }
                };
                fp.record.patch(node, FREQUENCY_PAR_ATTRS);
            }

            if let Some(custom) = rec.text("transducer_custom_name") {
                let installed = root.child_or_insert("Transducers");
                let inst = match installed.children.iter().position(|x| {
                    x.name == "Transducer" && x.attr("TransducerCustomName") == Some(custom)
                }) {
                    Some(i) => &mut installed.children[i],
                    None => {
                        installed.children.push(Element::new("Transducer"));
                        let last = installed.children.len() - 1;
                        &mut installed.children[last]
                    }
                };
                rec.patch(inst, INSTALLED_TRANSDUCER_ATTRS);
            }
        }
        Ok(root)
    }
}

// ─── Environment ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    pub record: XmlRecord,
    /// Per-transducer sound speed, `(TransducerName, SoundSpeed)`.
    pub transducer_sound_speeds: Vec<(String, f64)>,
}

impl Environment {
    pub fn sound_speed(&self) -> Option<f64> {
        self.record.f64("sound_speed")
    }

    fn from_root(root: &Element) -> Self {
        let mut record = XmlRecord::default();
        for env in root.find_all("Environment") {
            record.absorb(env, ENVIRONMENT_ATTRS);
        }
        let transducer_sound_speeds = root
            .find_all("Transducer")
            .into_iter()
            .filter_map(|x| {
                let name = x.attr("TransducerName")?;
                let speed = x.attr("SoundSpeed")?.trim().parse().ok()?;
                Some((name.to_string(), speed))
            })
            .collect();
        Self {
            record,
            transducer_sound_speeds,
        }
    }

    fn to_root(&self) -> Element {
        let mut root = Element::new("Environment");
        self.record.patch(&mut root, ENVIRONMENT_ATTRS);
        for (name, speed) in &self.transducer_sound_speeds {
            let mut x = Element::new("Transducer");
            x.set_attr("TransducerName", name.clone());
            x.set_attr("SoundSpeed", speed.to_string());
            root.children.push(x);
        }
        root
    }
}

// ─── Ping Parameters ────────────────────────────────────────────────────────

/// Transmit parameters the sounder records ahead of each RAW3 datagram.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PingParameters {
    pub record: XmlRecord,
}

impl PingParameters {
    pub fn channel_id(&self) -> Option<&str> {
        self.record.text("channel_id")
    }

    fn from_root(root: &Element) -> Self {
        let mut record = XmlRecord::default();
        for chan in root.find_all("Channel") {
            record.absorb(chan, PARAMETER_ATTRS);
        }
        Self { record }
    }

    fn to_root(&self) -> Element {
        let mut root = Element::new("Parameter");
        let mut chan = Element::new("Channel");
        self.record.patch(&mut chan, PARAMETER_ATTRS);
        root.children.push(chan);
        root
    }
}

// ─── XML0 ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum XmlDatagram {
    Configuration(XmlConfiguration),
    Parameter(PingParameters),
    Environment(Environment),
    /// Any other root tag, kept verbatim.
    Other { subtype: String, xml: String },
}

impl XmlDatagram {
    pub fn subtype(&self) -> &str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Parameter(_) => "parameter",
            Self::Environment(_) => "environment",
            Self::Other { subtype, .. } => subtype,
        }
    }

    pub fn parse(text: &str) -> Result<Self, DatagramError> {
        let root = parse_document(text)?;
        Ok(match root.name.to_lowercase().as_str() {
            "configuration" => Self::Configuration(XmlConfiguration::from_root(&root, text)?),
            "parameter" => Self::Parameter(PingParameters::from_root(&root)),
            "environment" => Self::Environment(Environment::from_root(&root)),
            other => Self::Other {
                subtype: other.to_string(),
                xml: text.to_string(),
            },
        })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, DatagramError> {
        match self {
            Self::Configuration(c) => write_document(&c.to_root()?),
            Self::Parameter(p) => write_document(&p.to_root()),
            Self::Environment(e) => write_document(&e.to_root()),
            Self::Other { xml, .. } => Ok(xml.as_bytes().to_vec()),
        }
    }
}

impl PayloadBody for XmlDatagram {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let bytes = strip_nuls(cur.rest());
        let text = std::str::from_utf8(bytes).map_err(xml_err)?;
        Self::parse(text)
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_word_padded(&self.to_xml()?);
        Ok(())
    }
}

//! Package repository definitions.
//!
//! A project declares its extra archives as a list of loosely typed objects
//! (the *marshalled* form, usually coming from YAML or TOML). This module
//! turns each object into one of three validated, immutable definitions:
//!
//! | Variant | Selected when the object has | Archive |
//! |---|---|---|
//! | [`AptRepository`] | neither `ppa` nor `cloud` | any APT archive reachable by URL |
//! | [`PpaRepository`] | a `ppa` key | a Launchpad Personal Package Archive |
//! | [`UcaRepository`] | a `cloud` key | the Ubuntu Cloud Archive |
//!
//! Definitions are frozen: changing a field means building a new value with
//! one of the `with_*` methods, which runs validation again.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::UCA_NETLOC;
use crate::errors::{PpaFormatError, PriorityError, ValidationError};
use crate::priority::Priority;
use crate::source::DebFormat;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static pattern is valid"));

const APT_PROPERTIES: &[&str] = &[
    "type",
    "priority",
    "url",
    "key-id",
    "name",
    "architectures",
    "formats",
    "path",
    "components",
    "key-server",
    "suites",
];
const PPA_PROPERTIES: &[&str] = &["type", "priority", "ppa"];
const UCA_PROPERTIES: &[&str] = &["type", "priority", "cloud", "pocket"];

/// Any supported package repository definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRepository {
    /// A plain APT archive.
    Apt(AptRepository),
    /// A Launchpad PPA.
    Ppa(PpaRepository),
    /// An Ubuntu Cloud Archive pocket.
    Uca(UcaRepository),
}

impl PackageRepository {
    /// Validate a single marshalled repository.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `data` is not an object or does not
    /// describe a valid repository.
    pub fn unmarshal(data: &Value) -> Result<Self, ValidationError> {
        let Some(map) = data.as_object() else {
            return Err(ValidationError::new(describe(data), "invalid object.")
                .with_details("Package repository must be a valid dictionary object.")
                .with_resolution(
                    "Verify repository configuration and ensure that the correct syntax is used.",
                ));
        };

        if map.contains_key("ppa") {
            PpaRepository::unmarshal(data).map(Self::Ppa)
        } else if map.contains_key("cloud") {
            UcaRepository::unmarshal(data).map(Self::Uca)
        } else {
            AptRepository::unmarshal(data).map(Self::Apt)
        }
    }

    /// Validate a marshalled list of repositories. A missing list is empty.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `data` is not a list or any entry is
    /// invalid.
    pub fn unmarshal_package_repositories(
        data: Option<&Value>,
    ) -> Result<Vec<Self>, ValidationError> {
        let Some(data) = data else {
            return Ok(Vec::new());
        };
        let Some(list) = data.as_array() else {
            return Err(ValidationError::new(describe(data), "invalid list object.")
                .with_details("Package repositories must be a list of objects.")
                .with_resolution(
                    "Verify 'package-repositories' configuration and ensure that the correct \
                     syntax is used.",
                ));
        };
        list.iter().map(Self::unmarshal).collect()
    }

    /// The marshalled form of this repository.
    pub fn marshal(&self) -> Value {
        match self {
            Self::Apt(repo) => repo.marshal(),
            Self::Ppa(repo) => repo.marshal(),
            Self::Uca(repo) => repo.marshal(),
        }
    }

    /// Pin priority, if the repository asks for one.
    pub fn priority(&self) -> Option<Priority> {
        match self {
            Self::Apt(repo) => repo.priority,
            Self::Ppa(repo) => repo.priority,
            Self::Uca(repo) => repo.priority,
        }
    }

    /// The `Pin:` expression matching packages from this repository.
    pub fn pin(&self) -> String {
        match self {
            Self::Apt(repo) => repo.pin(),
            Self::Ppa(repo) => repo.pin(),
            Self::Uca(repo) => repo.pin(),
        }
    }

    /// The URL, PPA or cloud naming this repository.
    pub fn location(&self) -> &str {
        match self {
            Self::Apt(repo) => repo.url(),
            Self::Ppa(repo) => repo.ppa(),
            Self::Uca(repo) => repo.cloud(),
        }
    }

    /// Short label for the kind of repository.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Apt(_) => "apt",
            Self::Ppa(_) => "ppa",
            Self::Uca(_) => "uca",
        }
    }
}

impl From<AptRepository> for PackageRepository {
    fn from(repo: AptRepository) -> Self {
        Self::Apt(repo)
    }
}

impl From<PpaRepository> for PackageRepository {
    fn from(repo: PpaRepository) -> Self {
        Self::Ppa(repo)
    }
}

impl From<UcaRepository> for PackageRepository {
    fn from(repo: UcaRepository) -> Self {
        Self::Uca(repo)
    }
}

// ---------------------------------------------------------------------------
// APT
// ---------------------------------------------------------------------------

/// A plain APT archive identified by URL and signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptRepository {
    url: String,
    netloc: String,
    key_id: String,
    name: Option<String>,
    architectures: Option<Vec<String>>,
    formats: Option<Vec<DebFormat>>,
    path: Option<String>,
    components: Option<Vec<String>>,
    suites: Option<Vec<String>>,
    key_server: Option<String>,
    priority: Option<Priority>,
}

/// Collects the fields of an [`AptRepository`] before validation.
#[derive(Debug, Clone, Default)]
pub struct AptRepositoryBuilder {
    url: String,
    key_id: String,
    name: Option<String>,
    architectures: Option<Vec<String>>,
    formats: Option<Vec<DebFormat>>,
    path: Option<String>,
    components: Option<Vec<String>>,
    suites: Option<Vec<String>>,
    key_server: Option<String>,
    priority: Option<Priority>,
}

impl AptRepositoryBuilder {
    /// Archive base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Fingerprint of the archive signing key.
    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Explicit name, used for the generated sources file.
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Architectures to restrict the archive to.
    pub fn architectures(mut self, architectures: Option<Vec<String>>) -> Self {
        self.architectures = architectures;
        self
    }

    /// Entry kinds to enable.
    pub fn formats(mut self, formats: Option<Vec<DebFormat>>) -> Self {
        self.formats = formats;
        self
    }

    /// Exact path inside the archive (flat repositories).
    pub fn path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    /// Archive components.
    pub fn components(mut self, components: Option<Vec<String>>) -> Self {
        self.components = components;
        self
    }

    /// Archive suites.
    pub fn suites(mut self, suites: Option<Vec<String>>) -> Self {
        self.suites = suites;
        self
    }

    /// Keyserver to fetch the signing key from.
    pub fn key_server(mut self, key_server: Option<String>) -> Self {
        self.key_server = key_server;
        self
    }

    /// Pin priority.
    pub fn priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    /// Validate the collected fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first problem found.
    pub fn build(self) -> Result<AptRepository, ValidationError> {
        let raw_url = self.url.trim();
        if raw_url.is_empty() {
            return Err(ValidationError::new(raw_url, "invalid URL.")
                .with_details("URLs must be non-empty strings.")
                .check_property("url"));
        }
        let parsed = url::Url::parse(raw_url).map_err(|e| {
            ValidationError::new(raw_url, format!("invalid URL '{raw_url}'."))
                .with_details(format!("URLs must be absolute: {e}."))
                .check_property("url")
        })?;
        let url = parsed.as_str().trim_end_matches('/').to_string();
        let netloc = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        if !is_fingerprint(&self.key_id) {
            return Err(
                ValidationError::new(&url, format!("invalid key-id '{}'.", self.key_id))
                    .with_details("Key IDs must be 40 upper-case hexadecimal characters.")
                    .check_property("key-id"),
            );
        }

        if self.name.as_deref() == Some("") {
            return Err(ValidationError::new(&url, "invalid name ''.")
                .with_details("Names must be non-empty strings.")
                .check_property("name"));
        }

        if self.path.as_deref() == Some("") {
            return Err(ValidationError::new(&url, "invalid path ''.")
                .with_details("Paths must be non-empty strings.")
                .with_resolution(
                    "Verify the repository configuration and ensure that 'path' is a \
                     non-empty string such as '/'.",
                ));
        }

        let suites = self.suites.as_deref().unwrap_or_default();
        let components = self.components.as_deref().unwrap_or_default();

        if let Some(suite) = suites.iter().find(|s| s.ends_with('/')) {
            return Err(
                ValidationError::new(&url, format!("invalid suite '{suite}'."))
                    .with_details("Suites must not end with a '/'.")
                    .with_resolution(
                        "Verify the repository configuration and remove the trailing '/' \
                         from suites or use the 'path' property to define a path.",
                    ),
            );
        }

        if let Some(path) = &self.path {
            for (property, values) in [("suites", suites), ("components", components)] {
                if !values.is_empty() {
                    return Err(ValidationError::new(
                        &url,
                        format!(
                            "{property} {} cannot be combined with path '{path}'.",
                            quoted_list(values)
                        ),
                    )
                    .with_details(format!(
                        "Path and {property} are incompatible options."
                    ))
                    .with_resolution(format!(
                        "Verify the repository configuration and remove 'path' or '{property}'."
                    )));
                }
            }
        }

        if !suites.is_empty() && components.is_empty() {
            return Err(ValidationError::new(&url, "no components specified.")
                .with_details("Components are required when using suites.")
                .check_property("components"));
        }
        if !components.is_empty() && suites.is_empty() {
            return Err(ValidationError::new(&url, "no suites specified.")
                .with_details("Suites are required when using components.")
                .check_property("suites"));
        }

        Ok(AptRepository {
            url,
            netloc,
            key_id: self.key_id,
            name: self.name,
            architectures: self.architectures,
            formats: self.formats,
            path: self.path,
            components: self.components,
            suites: self.suites,
            key_server: self.key_server,
            priority: self.priority,
        })
    }
}

impl AptRepository {
    /// Start building a repository for `url` signed by `key_id`.
    pub fn builder(url: impl Into<String>, key_id: impl Into<String>) -> AptRepositoryBuilder {
        AptRepositoryBuilder::default().url(url).key_id(key_id)
    }

    /// A builder pre-filled with this repository's fields.
    pub fn to_builder(&self) -> AptRepositoryBuilder {
        AptRepositoryBuilder {
            url: self.url.clone(),
            key_id: self.key_id.clone(),
            name: self.name.clone(),
            architectures: self.architectures.clone(),
            formats: self.formats.clone(),
            path: self.path.clone(),
            components: self.components.clone(),
            suites: self.suites.clone(),
            key_server: self.key_server.clone(),
            priority: self.priority,
        }
    }

    /// A copy of this repository pointing at another URL.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `url` is not a valid archive URL.
    pub fn with_url(&self, url: impl Into<String>) -> Result<Self, ValidationError> {
        self.to_builder().url(url).build()
    }

    /// A copy of this repository with another pin priority.
    pub fn with_priority(&self, priority: Option<Priority>) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }

    /// Validate a marshalled APT repository.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the object is malformed or invalid.
    pub fn unmarshal(data: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(data, "url")?;
        fields.check_type()?;
        fields.check_properties(APT_PROPERTIES)?;

        let formats = fields
            .string_list("formats")?
            .map(|formats| {
                formats
                    .iter()
                    .map(|f| {
                        f.parse::<DebFormat>().map_err(|_| {
                            ValidationError::new(&fields.location, format!("invalid format '{f}'."))
                                .with_details("Formats must be 'deb' or 'deb-src'.")
                                .check_property("formats")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Self::builder(
            fields.string("url")?.unwrap_or_default(),
            fields.required_string("key-id")?,
        )
        .name(fields.string("name")?)
        .architectures(fields.string_list("architectures")?)
        .formats(formats)
        .path(fields.string("path")?)
        .components(fields.string_list("components")?)
        .suites(fields.string_list("suites")?)
        .key_server(fields.string("key-server")?)
        .priority(fields.priority()?)
        .build()
    }

    /// The marshalled form of this repository.
    pub fn marshal(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), json!("apt"));
        map.insert("url".into(), json!(self.url));
        map.insert("key-id".into(), json!(self.key_id));
        insert_opt(&mut map, "name", self.name.as_ref());
        insert_opt(&mut map, "architectures", self.architectures.as_ref());
        if let Some(formats) = &self.formats {
            let formats: Vec<&str> = formats.iter().map(|f| f.as_str()).collect();
            map.insert("formats".into(), json!(formats));
        }
        insert_opt(&mut map, "path", self.path.as_ref());
        insert_opt(&mut map, "components", self.components.as_ref());
        insert_opt(&mut map, "suites", self.suites.as_ref());
        insert_opt(&mut map, "key-server", self.key_server.as_ref());
        insert_priority(&mut map, self.priority);
        Value::Object(map)
    }

    /// The repository name: the explicit one, or the URL with every run of
    /// non-word characters replaced by `_`.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => NON_WORD.replace_all(&self.url, "_").into_owned(),
        }
    }

    /// Pin expression matching this archive's origin host.
    pub fn pin(&self) -> String {
        format!("origin \"{}\"", self.netloc)
    }

    /// Archive base URL, without a trailing `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fingerprint of the signing key.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Architectures the archive is restricted to.
    pub fn architectures(&self) -> Option<&[String]> {
        self.architectures.as_deref()
    }

    /// Enabled entry kinds.
    pub fn formats(&self) -> Option<&[DebFormat]> {
        self.formats.as_deref()
    }

    /// Exact path inside the archive.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Archive components.
    pub fn components(&self) -> Option<&[String]> {
        self.components.as_deref()
    }

    /// Archive suites.
    pub fn suites(&self) -> Option<&[String]> {
        self.suites.as_deref()
    }

    /// Keyserver to fetch the signing key from.
    pub fn key_server(&self) -> Option<&str> {
        self.key_server.as_deref()
    }

    /// Pin priority.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

// ---------------------------------------------------------------------------
// PPA
// ---------------------------------------------------------------------------

/// A Launchpad Personal Package Archive, written `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpaRepository {
    ppa: String,
    priority: Option<Priority>,
}

impl PpaRepository {
    /// Create a PPA definition.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `ppa` is empty.
    pub fn new(ppa: impl Into<String>) -> Result<Self, ValidationError> {
        let ppa = ppa.into();
        if ppa.is_empty() {
            return Err(ValidationError::new(&ppa, "invalid PPA.")
                .with_details("PPAs must be non-empty strings.")
                .with_resolution(
                    "Verify repository configuration and ensure that 'ppa' is correctly specified.",
                ));
        }
        Ok(Self {
            ppa,
            priority: None,
        })
    }

    /// A copy of this PPA with another pin priority.
    pub fn with_priority(&self, priority: Option<Priority>) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }

    /// Validate a marshalled PPA.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the object is malformed or invalid.
    pub fn unmarshal(data: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(data, "ppa")?;
        fields.check_type()?;
        fields.check_properties(PPA_PROPERTIES)?;
        let repo = Self::new(fields.string("ppa")?.unwrap_or_default())?;
        Ok(repo.with_priority(fields.priority()?))
    }

    /// The marshalled form of this PPA.
    pub fn marshal(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), json!("apt"));
        map.insert("ppa".into(), json!(self.ppa));
        insert_priority(&mut map, self.priority);
        Value::Object(map)
    }

    /// Split into `(owner, name)`.
    ///
    /// # Errors
    ///
    /// Returns a [`PpaFormatError`] unless the PPA is exactly `owner/name`.
    pub fn split(&self) -> Result<(&str, &str), PpaFormatError> {
        match self.ppa.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok((owner, name))
            }
            _ => Err(PpaFormatError {
                ppa: self.ppa.clone(),
            }),
        }
    }

    /// Pin expression matching the Launchpad origin of this PPA.
    pub fn pin(&self) -> String {
        format!("release o=LP-PPA-{}", self.ppa.replace('/', "-"))
    }

    /// The PPA as written, `owner/name`.
    pub fn ppa(&self) -> &str {
        &self.ppa
    }

    /// Pin priority.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

// ---------------------------------------------------------------------------
// Ubuntu Cloud Archive
// ---------------------------------------------------------------------------

/// Pocket of the Ubuntu Cloud Archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UcaPocket {
    /// Released updates.
    #[default]
    Updates,
    /// Pre-release testing.
    Proposed,
}

impl UcaPocket {
    /// The pocket name as used in suite names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updates => "updates",
            Self::Proposed => "proposed",
        }
    }
}

impl std::fmt::Display for UcaPocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UcaPocket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updates" => Ok(Self::Updates),
            "proposed" => Ok(Self::Proposed),
            _ => Err(format!("Unknown pocket: {s}")),
        }
    }
}

/// A release of the Ubuntu Cloud Archive (e.g. OpenStack `antelope`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UcaRepository {
    cloud: String,
    pocket: UcaPocket,
    priority: Option<Priority>,
}

impl UcaRepository {
    /// Create a cloud archive definition.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `cloud` is empty.
    pub fn new(cloud: impl Into<String>, pocket: UcaPocket) -> Result<Self, ValidationError> {
        let cloud = cloud.into();
        if cloud.is_empty() {
            return Err(ValidationError::new(&cloud, "invalid cloud.")
                .with_details("Clouds must be non-empty strings.")
                .check_property("cloud"));
        }
        Ok(Self {
            cloud,
            pocket,
            priority: None,
        })
    }

    /// A copy of this cloud archive with another pin priority.
    pub fn with_priority(&self, priority: Option<Priority>) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }

    /// Validate a marshalled cloud archive.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the object is malformed or invalid.
    pub fn unmarshal(data: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(data, "cloud")?;
        fields.check_type()?;
        fields.check_properties(UCA_PROPERTIES)?;
        let pocket = match fields.string("pocket")? {
            None => UcaPocket::default(),
            Some(pocket) => pocket.parse().map_err(|_| {
                ValidationError::new(&fields.location, format!("invalid pocket '{pocket}'."))
                    .with_details("Pockets must be 'updates' or 'proposed'.")
                    .check_property("pocket")
            })?,
        };
        let repo = Self::new(fields.string("cloud")?.unwrap_or_default(), pocket)?;
        Ok(repo.with_priority(fields.priority()?))
    }

    /// The marshalled form of this cloud archive.
    pub fn marshal(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), json!("apt"));
        map.insert("cloud".into(), json!(self.cloud));
        map.insert("pocket".into(), json!(self.pocket.as_str()));
        insert_priority(&mut map, self.priority);
        Value::Object(map)
    }

    /// Pin expression matching the cloud archive host.
    pub fn pin(&self) -> String {
        format!("origin \"{UCA_NETLOC}\"")
    }

    /// Cloud release name.
    pub fn cloud(&self) -> &str {
        &self.cloud
    }

    /// Archive pocket.
    pub fn pocket(&self) -> UcaPocket {
        self.pocket
    }

    /// Pin priority.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

// ---------------------------------------------------------------------------
// Marshalled field access
// ---------------------------------------------------------------------------

/// Typed access to the properties of a marshalled repository.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    location: String,
}

impl<'a> Fields<'a> {
    fn new(data: &'a Value, location_key: &str) -> Result<Self, ValidationError> {
        let Some(map) = data.as_object() else {
            return Err(ValidationError::new(describe(data), "invalid object.")
                .with_details("Package repository must be a valid dictionary object.")
                .with_resolution(
                    "Verify repository configuration and ensure that the correct syntax is used.",
                ));
        };
        let location = map.get(location_key).map_or_else(|| describe(data), describe);
        Ok(Self { map, location })
    }

    fn check_type(&self) -> Result<(), ValidationError> {
        match self.map.get("type") {
            Some(Value::String(kind)) if kind == "apt" => Ok(()),
            Some(other) => Err(ValidationError::new(
                &self.location,
                format!("unsupported type '{}'.", describe(other)),
            )
            .with_details("The only currently supported type is 'apt'.")
            .check_property("type")),
            None => Err(
                ValidationError::new(&self.location, "missing property 'type'.")
                    .check_property("type"),
            ),
        }
    }

    fn check_properties(&self, allowed: &[&str]) -> Result<(), ValidationError> {
        let mut unknown: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|key| !allowed.contains(key))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        let names: Vec<String> = unknown.iter().map(|key| format!("'{key}'")).collect();
        Err(ValidationError::new(
            &self.location,
            format!("unsupported properties {}.", names.join(", ")),
        ))
    }

    fn string(&self, key: &str) -> Result<Option<String>, ValidationError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(ValidationError::new(&self.location, format!("invalid '{key}'."))
                .with_details(format!("'{key}' must be a string."))
                .check_property(key)),
        }
    }

    fn required_string(&self, key: &str) -> Result<String, ValidationError> {
        self.string(key)?.ok_or_else(|| {
            ValidationError::new(&self.location, format!("missing property '{key}'."))
                .check_property(key)
        })
    }

    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, ValidationError> {
        let invalid = || {
            ValidationError::new(&self.location, format!("invalid '{key}'."))
                .with_details(format!("'{key}' must be a list of strings."))
                .check_property(key)
        };
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(invalid()),
        }
    }

    fn priority(&self) -> Result<Option<Priority>, ValidationError> {
        let result = match self.map.get("priority") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(name)) => name.parse::<Priority>(),
            Some(Value::Number(number)) => match number.as_i64() {
                Some(value) => Priority::new(value),
                None => Err(PriorityError::Unknown(number.to_string())),
            },
            Some(other) => Err(PriorityError::Unknown(describe(other))),
        };
        result.map(Some).map_err(|e| {
            ValidationError::new(&self.location, e.to_string()).check_property("priority")
        })
    }
}

/// Whether `key_id` is a full, upper-case OpenPGP v4 fingerprint.
fn is_fingerprint(key_id: &str) -> bool {
    key_id.len() == 40
        && key_id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

/// Render a value the way a user would write it: strings unquoted.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    format!("[{}]", quoted.join(", "))
}

fn insert_opt<T: Clone + Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<&T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.clone().into());
    }
}

fn insert_priority(map: &mut Map<String, Value>, priority: Option<Priority>) {
    if let Some(priority) = priority {
        map.insert("priority".into(), json!(priority.get()));
    }
}

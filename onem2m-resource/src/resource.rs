//! Typed oneM2M resources.
//!
//! [`Resource`] is a tagged union over every supported resource type. Each
//! variant wraps a struct holding the common [`ResourceBase`] attributes plus
//! its type-specific attributes, named after the oneM2M long attribute names.

use crate::fields::{FieldSink, FieldSource};
use crate::types::{NotificationContentType, ResourceType, WriteMode};

/// Attributes common to every resource type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceBase {
    /// `rn`
    pub resource_name: Option<String>,
    /// `ri`
    pub resource_id: Option<String>,
    /// `pi`
    pub parent_id: Option<String>,
    /// `ct`
    pub creation_time: Option<String>,
    /// `lt`
    pub last_modified_time: Option<String>,
    /// `et`
    pub expiration_time: Option<String>,
    /// `st`
    pub state_tag: Option<i64>,
    /// `lbl`
    pub labels: Vec<String>,
    /// `acpi`
    pub access_control_policy_ids: Vec<String>,
    /// `at`
    pub announce_to: Vec<String>,
    /// `aa`
    pub announced_attribute: Vec<String>,
    /// Structured (path-form) identifier of this resource.
    ///
    /// Local bookkeeping only, never sent on the wire.
    pub structured_path: Option<String>,
}

/// Per-type attribute mapping shared by the XML and JSON backends.
pub(crate) trait Attributes {
    fn read_attributes<S: FieldSource>(&mut self, src: &S);
    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode);
}

fn read_text<S: FieldSource>(src: &S, key: &str, slot: &mut Option<String>) {
    if let Some(value) = src.text(key) {
        *slot = Some(value);
    }
}

fn read_integer<S: FieldSource>(src: &S, key: &str, slot: &mut Option<i64>) {
    if let Some(value) = src.integer(key) {
        *slot = Some(value);
    }
}

fn read_boolean<S: FieldSource>(src: &S, key: &str, slot: &mut Option<bool>) {
    if let Some(value) = src.boolean(key) {
        *slot = Some(value);
    }
}

fn read_list<S: FieldSource>(src: &S, key: &str, slot: &mut Vec<String>) {
    let values = src.list(key);
    if !values.is_empty() {
        *slot = values;
    }
}

impl Attributes for ResourceBase {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        if let Some(name) = src.resource_name() {
            self.resource_name = Some(name);
        }
        read_text(src, "ri", &mut self.resource_id);
        read_text(src, "pi", &mut self.parent_id);
        read_text(src, "ct", &mut self.creation_time);
        read_text(src, "lt", &mut self.last_modified_time);
        read_text(src, "et", &mut self.expiration_time);
        read_integer(src, "st", &mut self.state_tag);
        read_list(src, "lbl", &mut self.labels);
        read_list(src, "acpi", &mut self.access_control_policy_ids);
        read_list(src, "at", &mut self.announce_to);
        read_list(src, "aa", &mut self.announced_attribute);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        if mode == WriteMode::Create {
            sink.put_opt_text("rn", &self.resource_name);
        }
        sink.put_non_empty_list("lbl", &self.labels);
        sink.put_non_empty_list("aa", &self.announced_attribute);
        sink.put_non_empty_list("at", &self.announce_to);
        sink.put_non_empty_list("acpi", &self.access_control_policy_ids);
    }
}

/// `<CSEBase>` (ty=5)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CseBase {
    pub base: ResourceBase,
    /// `cst`
    pub cse_type: Option<i64>,
    /// `csi`
    pub cse_id: Option<String>,
    /// `srt`
    pub supported_resource_types: Vec<String>,
    /// `poa`
    pub point_of_access: Vec<String>,
}

impl Attributes for CseBase {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_integer(src, "cst", &mut self.cse_type);
        read_text(src, "csi", &mut self.cse_id);
        read_list(src, "srt", &mut self.supported_resource_types);
        read_list(src, "poa", &mut self.point_of_access);
    }

    // A CSEBase is never created or updated through Mca.
    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
    }
}

/// `<remoteCSE>` (ty=16)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCse {
    pub base: ResourceBase,
    /// `cst`
    pub cse_type: Option<i64>,
    /// `cb`
    pub cse_base: Option<String>,
    /// `csi`
    pub cse_id: Option<String>,
    /// `rr`
    pub request_reachability: Option<bool>,
    /// `poa`
    pub point_of_access: Vec<String>,
}

impl Attributes for RemoteCse {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_integer(src, "cst", &mut self.cse_type);
        read_text(src, "cb", &mut self.cse_base);
        read_text(src, "csi", &mut self.cse_id);
        read_boolean(src, "rr", &mut self.request_reachability);
        read_list(src, "poa", &mut self.point_of_access);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        if mode == WriteMode::Create {
            sink.put_opt_integer("cst", self.cse_type);
            sink.put_opt_text("cb", &self.cse_base);
            sink.put_opt_text("csi", &self.cse_id);
        }
        sink.put_opt_boolean("rr", self.request_reachability);
        sink.put_non_empty_list("poa", &self.point_of_access);
    }
}

/// `<AE>` (ty=2)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ae {
    pub base: ResourceBase,
    /// `api`
    pub app_id: Option<String>,
    /// `aei`
    pub ae_id: Option<String>,
    /// `apn`
    pub app_name: Option<String>,
    /// `rr`
    pub request_reachability: Option<bool>,
    /// `poa`
    pub point_of_access: Vec<String>,
}

impl Attributes for Ae {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_text(src, "api", &mut self.app_id);
        read_text(src, "aei", &mut self.ae_id);
        read_text(src, "apn", &mut self.app_name);
        read_boolean(src, "rr", &mut self.request_reachability);
        read_list(src, "poa", &mut self.point_of_access);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        if mode == WriteMode::Create {
            sink.put_opt_text("api", &self.app_id);
        }
        sink.put_opt_text("apn", &self.app_name);
        sink.put_opt_boolean("rr", self.request_reachability);
        sink.put_non_empty_list("poa", &self.point_of_access);
    }
}

/// `<container>` (ty=3)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub base: ResourceBase,
    /// `mni`
    pub max_nr_of_instances: Option<i64>,
    /// `mbs`
    pub max_byte_size: Option<i64>,
    /// `mia`
    pub max_instance_age: Option<i64>,
    /// `cni`
    pub current_nr_of_instances: Option<i64>,
    /// `cbs`
    pub current_byte_size: Option<i64>,
}

impl Attributes for Container {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_integer(src, "mni", &mut self.max_nr_of_instances);
        read_integer(src, "mbs", &mut self.max_byte_size);
        read_integer(src, "mia", &mut self.max_instance_age);
        read_integer(src, "cni", &mut self.current_nr_of_instances);
        read_integer(src, "cbs", &mut self.current_byte_size);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        sink.put_opt_integer("mni", self.max_nr_of_instances);
        sink.put_opt_integer("mbs", self.max_byte_size);
        sink.put_opt_integer("mia", self.max_instance_age);
    }
}

/// `<contentInstance>` (ty=4)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentInstance {
    pub base: ResourceBase,
    /// `cnf`
    pub content_info: Option<String>,
    /// `cs`
    pub content_size: Option<i64>,
    /// `con`
    pub content: Option<String>,
}

impl ContentInstance {
    /// A new content instance carrying `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

impl Attributes for ContentInstance {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_text(src, "cnf", &mut self.content_info);
        read_integer(src, "cs", &mut self.content_size);
        read_text(src, "con", &mut self.content);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        sink.put_opt_text("cnf", &self.content_info);
        sink.put_opt_text("con", &self.content);
    }
}

/// `<group>` (ty=9)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub base: ResourceBase,
    /// `mt`
    pub member_type: Option<i64>,
    /// `cnm`
    pub current_nr_of_members: Option<i64>,
    /// `mnm`
    pub max_nr_of_members: Option<i64>,
    /// `mid`
    pub member_ids: Vec<String>,
    /// `mtv`
    pub member_type_validated: Option<bool>,
    /// `csy`
    pub consistency_strategy: Option<i64>,
    /// `gn`
    pub group_name: Option<String>,
    /// `fopt`
    pub fan_out_point: Option<String>,
}

impl Attributes for Group {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_integer(src, "mt", &mut self.member_type);
        read_integer(src, "cnm", &mut self.current_nr_of_members);
        read_integer(src, "mnm", &mut self.max_nr_of_members);
        read_list(src, "mid", &mut self.member_ids);
        read_boolean(src, "mtv", &mut self.member_type_validated);
        read_integer(src, "csy", &mut self.consistency_strategy);
        read_text(src, "gn", &mut self.group_name);
        read_text(src, "fopt", &mut self.fan_out_point);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        if mode == WriteMode::Create {
            sink.put_opt_integer("mnm", self.max_nr_of_members);
        }
        sink.put_opt_integer("mt", self.member_type);
        // mid is mandatory, even when empty
        sink.put_list("mid", &self.member_ids);
        if mode == WriteMode::Create {
            sink.put_opt_integer("csy", self.consistency_strategy);
        }
        sink.put_opt_text("gn", &self.group_name);
    }
}

/// One access control rule (`acr`) of a policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessControlRule {
    /// `acor`
    pub originators: Vec<String>,
    /// `acop`, a bit mask of permitted operations
    pub operations: Option<i64>,
}

impl AccessControlRule {
    fn read<S: FieldSource>(src: &S) -> Self {
        Self {
            originators: src.list("acor"),
            operations: src.integer("acop"),
        }
    }

    fn write<K: FieldSink>(&self, sink: &mut K) {
        sink.put_list("acor", &self.originators);
        sink.put_opt_integer("acop", self.operations);
    }
}

fn read_rules<S: FieldSource>(src: &S, key: &str) -> Vec<AccessControlRule> {
    src.child(key)
        .map(|set| set.children("acr").iter().map(AccessControlRule::read).collect())
        .unwrap_or_default()
}

fn write_rules<K: FieldSink>(sink: &mut K, key: &str, rules: &[AccessControlRule]) {
    sink.put_nested(key, |set| {
        set.put_nested_list("acr", rules, |entry, rule| rule.write(entry));
    });
}

/// `<accessControlPolicy>` (ty=1)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessControlPolicy {
    pub base: ResourceBase,
    /// `pv`
    pub privileges: Vec<AccessControlRule>,
    /// `pvs`
    pub self_privileges: Vec<AccessControlRule>,
}

impl Attributes for AccessControlPolicy {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        let privileges = read_rules(src, "pv");
        if !privileges.is_empty() {
            self.privileges = privileges;
        }
        let self_privileges = read_rules(src, "pvs");
        if !self_privileges.is_empty() {
            self.self_privileges = self_privileges;
        }
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        write_rules(sink, "pv", &self.privileges);
        write_rules(sink, "pvs", &self.self_privileges);
    }
}

/// `<subscription>` (ty=23)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    pub base: ResourceBase,
    /// `nu`, where the hosting CSE sends notifications
    pub notification_uri: Vec<String>,
    /// `nct`
    pub notification_content_type: Option<NotificationContentType>,
    /// `exc`, number of notifications after which the subscription is deleted
    pub expiration_counter: Option<i64>,
    /// `ln`
    pub latest_notify: Option<bool>,
    /// `gpi`
    pub group_id: Option<String>,
    /// `nfu`
    pub notification_forwarding_uri: Option<String>,
    /// `su`
    pub subscriber_uri: Option<String>,
}

impl Subscription {
    /// A new subscription that notifies the given targets with the full resource.
    pub fn with_notification_uri(notification_uri: Vec<String>) -> Self {
        Self {
            notification_uri,
            notification_content_type: Some(NotificationContentType::AllAttributes),
            ..Default::default()
        }
    }
}

impl Attributes for Subscription {
    fn read_attributes<S: FieldSource>(&mut self, src: &S) {
        self.base.read_attributes(src);
        read_list(src, "nu", &mut self.notification_uri);
        if let Some(nct) = src.integer("nct").and_then(NotificationContentType::from_code) {
            self.notification_content_type = Some(nct);
        }
        read_integer(src, "exc", &mut self.expiration_counter);
        read_boolean(src, "ln", &mut self.latest_notify);
        read_text(src, "gpi", &mut self.group_id);
        read_text(src, "nfu", &mut self.notification_forwarding_uri);
        read_text(src, "su", &mut self.subscriber_uri);
    }

    fn write_attributes<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        self.base.write_attributes(sink, mode);
        sink.put_list("nu", &self.notification_uri);
        sink.put_opt_integer("nct", self.notification_content_type.map(|n| n.code()));
        sink.put_opt_integer("exc", self.expiration_counter);
        sink.put_opt_boolean("ln", self.latest_notify);
        sink.put_opt_text("gpi", &self.group_id);
        sink.put_opt_text("nfu", &self.notification_forwarding_uri);
        sink.put_opt_text("su", &self.subscriber_uri);
    }
}

/// A typed oneM2M resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    AccessControlPolicy(AccessControlPolicy),
    Ae(Ae),
    Container(Container),
    ContentInstance(ContentInstance),
    CseBase(CseBase),
    Group(Group),
    RemoteCse(RemoteCse),
    Subscription(Subscription),
}

/// Evaluate `$body` with `$inner` bound to the variant's struct.
macro_rules! with_variant {
    ($resource:expr, $inner:ident => $body:expr) => {
        match $resource {
            Resource::AccessControlPolicy($inner) => $body,
            Resource::Ae($inner) => $body,
            Resource::Container($inner) => $body,
            Resource::ContentInstance($inner) => $body,
            Resource::CseBase($inner) => $body,
            Resource::Group($inner) => $body,
            Resource::RemoteCse($inner) => $body,
            Resource::Subscription($inner) => $body,
        }
    };
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Resource {
                fn from(inner: $variant) -> Self {
                    Resource::$variant(inner)
                }
            }
        )*
    };
}

impl_from_variant!(
    AccessControlPolicy,
    Ae,
    Container,
    ContentInstance,
    CseBase,
    Group,
    RemoteCse,
    Subscription,
);

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::AccessControlPolicy(_) => ResourceType::AccessControlPolicy,
            Resource::Ae(_) => ResourceType::Ae,
            Resource::Container(_) => ResourceType::Container,
            Resource::ContentInstance(_) => ResourceType::ContentInstance,
            Resource::CseBase(_) => ResourceType::CseBase,
            Resource::Group(_) => ResourceType::Group,
            Resource::RemoteCse(_) => ResourceType::RemoteCse,
            Resource::Subscription(_) => ResourceType::Subscription,
        }
    }

    pub fn base(&self) -> &ResourceBase {
        with_variant!(self, inner => &inner.base)
    }

    pub fn base_mut(&mut self) -> &mut ResourceBase {
        with_variant!(self, inner => &mut inner.base)
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.base().resource_id.as_deref()
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.base().resource_name.as_deref()
    }

    pub fn structured_path(&self) -> Option<&str> {
        self.base().structured_path.as_deref()
    }

    /// Set the identifier, returning the resource for chaining.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.base_mut().resource_id = Some(resource_id.into());
        self
    }

    /// Set the structured path, returning the resource for chaining.
    pub fn with_structured_path(mut self, path: impl Into<String>) -> Self {
        self.base_mut().structured_path = Some(path.into());
        self
    }

    /// Structured path of a child named `child_name`, if this resource's path is known.
    pub fn child_structured_path(&self, child_name: &str) -> Option<String> {
        self.structured_path()
            .map(|path| format!("{}/{}", path.trim_end_matches('/'), child_name))
    }

    pub fn as_content_instance(&self) -> Option<&ContentInstance> {
        match self {
            Resource::ContentInstance(cin) => Some(cin),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Resource::Container(cnt) => Some(cnt),
            _ => None,
        }
    }

    pub fn as_subscription(&self) -> Option<&Subscription> {
        match self {
            Resource::Subscription(sub) => Some(sub),
            _ => None,
        }
    }

    pub(crate) fn read_fields<S: FieldSource>(&mut self, src: &S) {
        with_variant!(self, inner => inner.read_attributes(src))
    }

    pub(crate) fn write_fields<K: FieldSink>(&self, sink: &mut K, mode: WriteMode) {
        with_variant!(self, inner => inner.write_attributes(sink, mode))
    }
}

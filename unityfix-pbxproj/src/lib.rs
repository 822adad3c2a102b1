//! Edit engine for Xcode `project.pbxproj` descriptors.
//!
//! Responsibilities:
//! - Parse the OpenStep plist dialect into an ordered object graph.
//! - Apply idempotent edits: ensure a file reference exists (with
//!   build-file entries), ensure a linker flag is set.
//! - Serialize back in the legacy "3.2" format Xcode writes itself.
//!
//! The descriptor is treated as data, not as a build model: edits only
//! add, never remove, and re-running any edit is a no-op.

mod error;
mod parser;
mod value;
mod writer;

pub use error::{Error, Result};
pub use value::{Dict, Value};

use camino::Utf8Path;
use fs_err as fs;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Where Xcode resolves a file reference from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceTree {
    /// Relative to the enclosing group.
    #[default]
    Group,
    /// Absolute path.
    Absolute,
    /// Relative to the active platform SDK.
    SdkRoot,
    /// Relative to the project directory.
    SourceRoot,
    /// Relative to the build products directory.
    BuiltProductsDir,
}

impl SourceTree {
    pub fn as_pbx(self) -> &'static str {
        match self {
            SourceTree::Group => "<group>",
            SourceTree::Absolute => "<absolute>",
            SourceTree::SdkRoot => "SDKROOT",
            SourceTree::SourceRoot => "SOURCE_ROOT",
            SourceTree::BuiltProductsDir => "BUILT_PRODUCTS_DIR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddFileOptions {
    pub tree: SourceTree,
    /// Group to attach the reference under; the main group when `None`.
    /// Created (under the main group) when it does not exist yet.
    pub group: Option<String>,
    /// Also create `PBXBuildFile` entries in every matching build phase.
    pub create_build_file: bool,
    /// Mark the build-file entries as weak-linked.
    pub weak: bool,
}

impl Default for AddFileOptions {
    fn default() -> Self {
        Self {
            tree: SourceTree::Group,
            group: None,
            create_build_file: true,
            weak: false,
        }
    }
}

/// Outcome of [`XcodeProject::add_file_if_missing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFile {
    Added {
        file_ref: String,
        build_files: Vec<String>,
    },
    AlreadyPresent {
        file_ref: String,
    },
}

impl AddFile {
    pub fn added(&self) -> bool {
        matches!(self, AddFile::Added { .. })
    }

    pub fn file_ref(&self) -> &str {
        match self {
            AddFile::Added { file_ref, .. } | AddFile::AlreadyPresent { file_ref } => file_ref,
        }
    }
}

/// An Xcode project descriptor, loaded from `project.pbxproj`.
#[derive(Debug, Clone)]
pub struct XcodeProject {
    root: Dict,
}

impl XcodeProject {
    pub fn parse(src: &str) -> Result<Self> {
        let root = parser::parse_plist(src)?;
        if root.get_dict("objects").is_none() {
            return Err(Error::Malformed("missing `objects` table".to_string()));
        }
        if root.get_str("rootObject").is_none() {
            return Err(Error::Malformed("missing `rootObject` reference".to_string()));
        }
        Ok(Self { root })
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Self::parse(&src)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        fs::write(path, self.to_pbxproj_string())?;
        Ok(())
    }

    /// Serializes the descriptor in the legacy format-3.2 shape.
    pub fn to_pbxproj_string(&self) -> String {
        writer::write_pbxproj(&self.root)
    }

    pub fn root(&self) -> &Dict {
        &self.root
    }

    /// The `objects` table: 24-hex-digit identifier to object dictionary.
    pub fn objects(&self) -> &Dict {
        // Presence is validated at parse.
        self.root
            .get_dict("objects")
            .expect("objects table validated at parse")
    }

    fn objects_mut(&mut self) -> &mut Dict {
        self.root
            .get_dict_mut("objects")
            .expect("objects table validated at parse")
    }

    /// Ensures a file reference for `path` exists.
    ///
    /// An existing `PBXFileReference` with the same path, or the same
    /// trailing file name, counts as present and nothing is touched.
    /// Otherwise the reference is created, attached to the requested group,
    /// and (when `create_build_file` is set) one `PBXBuildFile` is created
    /// per matching build phase and appended to that phase's files.
    pub fn add_file_if_missing(&mut self, path: &str, opts: &AddFileOptions) -> Result<AddFile> {
        let file_name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::Malformed(format!("file path has no final component: {path}")))?;

        if let Some(file_ref) = self.find_file_reference(path, &file_name) {
            debug!(path, %file_ref, "file reference already present");
            return Ok(AddFile::AlreadyPresent { file_ref });
        }

        let file_type = file_type_of(&file_name);
        let file_ref = self.fresh_id("PBXFileReference", path);
        let mut reference = Dict::new();
        reference.insert("isa", Value::from("PBXFileReference"));
        reference.insert("lastKnownFileType", Value::from(file_type));
        reference.insert("name", Value::from(file_name.as_str()));
        reference.insert("path", Value::from(path));
        reference.insert("sourceTree", Value::from(opts.tree.as_pbx()));
        self.objects_mut()
            .insert(file_ref.clone(), Value::Dict(reference));

        self.attach_to_group(&file_ref, opts.group.as_deref())?;

        let mut build_files = Vec::new();
        if opts.create_build_file
            && let Some(phase_isa) = build_phase_isa_for(file_type)
        {
            for phase_id in self.object_ids_with_isa(phase_isa) {
                let build_file = self.fresh_id("PBXBuildFile", &format!("{path}@{phase_id}"));
                let mut entry = Dict::new();
                entry.insert("isa", Value::from("PBXBuildFile"));
                entry.insert("fileRef", Value::from(file_ref.as_str()));
                if opts.weak {
                    let mut settings = Dict::new();
                    settings.insert("ATTRIBUTES", Value::Array(vec![Value::from("Weak")]));
                    entry.insert("settings", Value::Dict(settings));
                }
                self.objects_mut()
                    .insert(build_file.clone(), Value::Dict(entry));

                if let Some(phase) = self.objects_mut().get_dict_mut(&phase_id) {
                    if !phase.contains_key("files") {
                        phase.insert("files", Value::Array(Vec::new()));
                    }
                    if let Some(files) = phase.get_array_mut("files") {
                        files.push(Value::from(build_file.as_str()));
                    }
                }
                build_files.push(build_file);
            }
        }

        debug!(path, %file_ref, build_files = build_files.len(), "added file reference");
        Ok(AddFile::Added {
            file_ref,
            build_files,
        })
    }

    /// Ensures `flag` appears in `OTHER_LDFLAGS` of every build
    /// configuration. Returns whether anything changed.
    ///
    /// Existing scalar settings are promoted to arrays; the flag is never
    /// inserted twice.
    pub fn add_other_ldflags(&mut self, flag: &str) -> bool {
        let mut changed = false;
        for (id, value) in self.objects_mut().iter_mut() {
            let Some(obj) = value.as_dict_mut() else {
                continue;
            };
            if obj.get_str("isa") != Some("XCBuildConfiguration") {
                continue;
            }
            if !obj.contains_key("buildSettings") {
                obj.insert("buildSettings", Value::Dict(Dict::new()));
            }
            let Some(settings) = obj.get_dict_mut("buildSettings") else {
                continue;
            };

            let replacement = match settings.get("OTHER_LDFLAGS") {
                None => Some(Value::Array(vec![Value::from(flag)])),
                Some(Value::Str(existing)) if existing == flag => None,
                Some(Value::Str(existing)) => Some(Value::Array(vec![
                    Value::Str(existing.clone()),
                    Value::from(flag),
                ])),
                Some(Value::Array(items)) => {
                    if items.iter().any(|v| v.as_str() == Some(flag)) {
                        None
                    } else {
                        let mut items = items.clone();
                        items.push(Value::from(flag));
                        Some(Value::Array(items))
                    }
                }
                // A dict here is not something Xcode writes; leave it alone.
                Some(Value::Dict(_)) => None,
            };

            if let Some(new_value) = replacement {
                settings.insert("OTHER_LDFLAGS", new_value);
                debug!(configuration = id, flag, "added linker flag");
                changed = true;
            }
        }
        changed
    }

    fn find_file_reference(&self, path: &str, file_name: &str) -> Option<String> {
        for (id, value) in self.objects().iter() {
            let Some(obj) = value.as_dict() else { continue };
            if obj.get_str("isa") != Some("PBXFileReference") {
                continue;
            }
            let obj_path = obj.get_str("path");
            let same_path = obj_path == Some(path);
            let same_name = obj.get_str("name") == Some(file_name)
                || obj_path.is_some_and(|p| p.rsplit('/').next() == Some(file_name));
            if same_path || same_name {
                return Some(id.to_string());
            }
        }
        None
    }

    fn object_ids_with_isa(&self, isa: &str) -> Vec<String> {
        self.objects()
            .iter()
            .filter(|(_, v)| v.as_dict().and_then(|o| o.get_str("isa")) == Some(isa))
            .map(|(id, _)| id.to_string())
            .collect()
    }

    fn attach_to_group(&mut self, file_ref: &str, group_name: Option<&str>) -> Result<()> {
        let group_id = match group_name {
            Some(name) => match self.group_id_by_name(name) {
                Some(id) => id,
                None => self.create_group(name)?,
            },
            None => self.main_group_id()?,
        };

        let group = self
            .objects_mut()
            .get_dict_mut(&group_id)
            .ok_or_else(|| Error::Malformed(format!("group {group_id} has no object")))?;
        if !group.contains_key("children") {
            group.insert("children", Value::Array(Vec::new()));
        }
        if let Some(children) = group.get_array_mut("children")
            && !children.iter().any(|v| v.as_str() == Some(file_ref))
        {
            children.push(Value::from(file_ref));
        }
        Ok(())
    }

    fn group_id_by_name(&self, name: &str) -> Option<String> {
        for (id, value) in self.objects().iter() {
            let Some(obj) = value.as_dict() else { continue };
            if obj.get_str("isa") != Some("PBXGroup") {
                continue;
            }
            if obj.get_str("name") == Some(name) || obj.get_str("path") == Some(name) {
                return Some(id.to_string());
            }
        }
        None
    }

    fn create_group(&mut self, name: &str) -> Result<String> {
        let main_group = self.main_group_id()?;
        let group_id = self.fresh_id("PBXGroup", name);

        let mut group = Dict::new();
        group.insert("isa", Value::from("PBXGroup"));
        group.insert("children", Value::Array(Vec::new()));
        group.insert("name", Value::from(name));
        group.insert("sourceTree", Value::from(SourceTree::Group.as_pbx()));
        self.objects_mut().insert(group_id.clone(), Value::Dict(group));

        let main = self
            .objects_mut()
            .get_dict_mut(&main_group)
            .ok_or_else(|| Error::Malformed(format!("main group {main_group} has no object")))?;
        if !main.contains_key("children") {
            main.insert("children", Value::Array(Vec::new()));
        }
        if let Some(children) = main.get_array_mut("children") {
            children.push(Value::from(group_id.as_str()));
        }
        debug!(name, %group_id, "created group");
        Ok(group_id)
    }

    fn main_group_id(&self) -> Result<String> {
        let root_object = self
            .root
            .get_str("rootObject")
            .ok_or_else(|| Error::Malformed("missing `rootObject` reference".to_string()))?;
        self.objects()
            .get_dict(root_object)
            .and_then(|project| project.get_str("mainGroup"))
            .map(str::to_string)
            .ok_or_else(|| Error::Malformed("project object has no mainGroup".to_string()))
    }

    /// Deterministic 24-hex-digit identifier in the shape Xcode assigns.
    ///
    /// Derived from the object kind and its seed (path or name) so reruns
    /// generate the same identifiers; bumps a nonce on the improbable
    /// collision with an existing object.
    fn fresh_id(&self, kind: &str, seed: &str) -> String {
        let mut nonce: u32 = 0;
        loop {
            let mut hasher = Sha256::new();
            hasher.update(kind.as_bytes());
            hasher.update(b":");
            hasher.update(seed.as_bytes());
            if nonce > 0 {
                hasher.update(nonce.to_le_bytes());
            }
            let digest = hasher.finalize();
            let id = hex::encode_upper(&digest[..12]);
            if !self.objects().contains_key(&id) {
                return id;
            }
            nonce += 1;
        }
    }
}

fn file_type_of(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or("");
    match extension {
        "framework" => "wrapper.framework",
        "a" => "archive.ar",
        "dylib" => "compiled.mach-o.dylib",
        "h" => "sourcecode.c.h",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "plist" => "text.plist.xml",
        _ => "file",
    }
}

/// Which build phase a file type belongs to, when it belongs to one.
fn build_phase_isa_for(file_type: &str) -> Option<&'static str> {
    match file_type {
        "wrapper.framework" | "archive.ar" | "compiled.mach-o.dylib" => {
            Some("PBXFrameworksBuildPhase")
        }
        "sourcecode.c.objc" | "sourcecode.cpp.objcpp" => Some("PBXSourcesBuildPhase"),
        _ => None,
    }
}

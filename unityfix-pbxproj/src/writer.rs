//! Serializer for the legacy Xcode project format ("3.2").
//!
//! Output shape matches what Xcode itself writes: the `// !$*UTF8*$!`
//! header, tab indentation, the `objects` table split into
//! `/* Begin <isa> section */` blocks ordered by isa, one-line rendering
//! for build-file and file-reference entries, and `/* ... */` annotations
//! after every resolvable object identifier.

use crate::value::{Dict, Value};
use std::collections::BTreeMap;

/// Object kinds Xcode renders on a single line.
fn is_single_line_isa(isa: &str) -> bool {
    matches!(isa, "PBXBuildFile" | "PBXFileReference")
}

/// Bare-token rule for output. Stricter than what the parser accepts:
/// Xcode quotes `-ObjC` but leaves `System/Library/...` bare.
fn is_bare(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.'))
}

fn format_token(s: &str) -> String {
    if is_bare(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn looks_like_id(s: &str) -> bool {
    s.len() == 24
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

pub(crate) fn write_pbxproj(root: &Dict) -> String {
    let writer = Writer {
        objects: root.get_dict("objects"),
    };
    let mut out = String::from("// !$*UTF8*$!\n{\n");
    for (key, value) in root.iter() {
        if key == "objects"
            && let Value::Dict(objects) = value
        {
            out.push_str("\tobjects = {\n");
            writer.write_objects(&mut out, objects);
            out.push_str("\t};\n");
            continue;
        }
        out.push('\t');
        out.push_str(&format_token(key));
        out.push_str(" = ");
        writer.write_value(&mut out, value, 1);
        out.push_str(";\n");
    }
    out.push_str("}\n");
    out
}

struct Writer<'a> {
    objects: Option<&'a Dict>,
}

impl Writer<'_> {
    fn write_objects(&self, out: &mut String, objects: &Dict) {
        let mut sections: BTreeMap<&str, Vec<(&str, &Dict)>> = BTreeMap::new();
        for (id, value) in objects.iter() {
            let Some(obj) = value.as_dict() else {
                // Not an object; keep it, but outside any isa section.
                out.push_str("\t\t");
                out.push_str(&format_token(id));
                out.push_str(" = ");
                self.write_value(out, value, 2);
                out.push_str(";\n");
                continue;
            };
            let isa = obj.get_str("isa").unwrap_or("");
            sections.entry(isa).or_default().push((id, obj));
        }

        for (isa, entries) in sections {
            out.push_str(&format!("\n/* Begin {isa} section */\n"));
            for (id, obj) in entries {
                out.push_str("\t\t");
                self.write_annotated(out, id);
                out.push_str(" = ");
                if is_single_line_isa(isa) {
                    self.write_inline_dict(out, obj);
                } else {
                    self.write_dict(out, obj, 2);
                }
                out.push_str(";\n");
            }
            out.push_str(&format!("/* End {isa} section */\n"));
        }
    }

    fn write_value(&self, out: &mut String, value: &Value, indent: usize) {
        match value {
            Value::Str(s) => self.write_annotated(out, s),
            Value::Array(items) => self.write_array(out, items, indent),
            Value::Dict(dict) => self.write_dict(out, dict, indent),
        }
    }

    fn write_dict(&self, out: &mut String, dict: &Dict, indent: usize) {
        out.push_str("{\n");
        for (key, value) in dict.iter() {
            push_tabs(out, indent + 1);
            out.push_str(&format_token(key));
            out.push_str(" = ");
            self.write_value(out, value, indent + 1);
            out.push_str(";\n");
        }
        push_tabs(out, indent);
        out.push('}');
    }

    fn write_array(&self, out: &mut String, items: &[Value], indent: usize) {
        out.push_str("(\n");
        for item in items {
            push_tabs(out, indent + 1);
            self.write_value(out, item, indent + 1);
            out.push_str(",\n");
        }
        push_tabs(out, indent);
        out.push(')');
    }

    fn write_inline_dict(&self, out: &mut String, dict: &Dict) {
        out.push('{');
        for (key, value) in dict.iter() {
            out.push_str(&format_token(key));
            out.push_str(" = ");
            self.write_inline_value(out, value);
            out.push_str("; ");
        }
        out.push('}');
    }

    fn write_inline_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Str(s) => self.write_annotated(out, s),
            Value::Array(items) => {
                out.push('(');
                for item in items {
                    self.write_inline_value(out, item);
                    out.push_str(", ");
                }
                out.push(')');
            }
            Value::Dict(dict) => self.write_inline_dict(out, dict),
        }
    }

    /// Writes a string token, annotating object identifiers with the
    /// `/* display name */` comment Xcode places after them.
    fn write_annotated(&self, out: &mut String, s: &str) {
        out.push_str(&format_token(s));
        if looks_like_id(s)
            && let Some(comment) = self.comment_for(s)
        {
            out.push_str(" /* ");
            out.push_str(&comment);
            out.push_str(" */");
        }
    }

    fn comment_for(&self, id: &str) -> Option<String> {
        let objects = self.objects?;
        let obj = objects.get_dict(id)?;
        let isa = obj.get_str("isa")?;

        let comment = match isa {
            "PBXProject" => Some("Project object".to_string()),
            "PBXBuildFile" => {
                let file = obj
                    .get_str("fileRef")
                    .and_then(|r| self.display_name(objects.get_dict(r)?));
                match (file, self.phase_containing(id)) {
                    (Some(file), Some(phase)) => Some(format!("{file} in {phase}")),
                    (file, _) => file,
                }
            }
            "XCConfigurationList" => self.configuration_list_comment(id),
            isa if isa.ends_with("BuildPhase") => Some(phase_display_name(isa, obj)),
            _ => self.display_name(obj),
        }?;

        // Names that would break out of the comment are not annotated.
        if comment.contains('*') || comment.contains('\n') {
            return None;
        }
        Some(comment)
    }

    fn display_name(&self, obj: &Dict) -> Option<String> {
        obj.get_str("name")
            .or_else(|| obj.get_str("path").map(basename))
            .map(str::to_string)
    }

    /// Finds the build phase whose `files` list holds the given build file.
    fn phase_containing(&self, build_file_id: &str) -> Option<String> {
        let objects = self.objects?;
        for (_, value) in objects.iter() {
            let Some(obj) = value.as_dict() else { continue };
            let Some(isa) = obj.get_str("isa") else {
                continue;
            };
            if !isa.ends_with("BuildPhase") {
                continue;
            }
            let in_phase = obj
                .get("files")
                .and_then(Value::as_array)
                .is_some_and(|files| files.iter().any(|f| f.as_str() == Some(build_file_id)));
            if in_phase {
                return Some(phase_display_name(isa, obj));
            }
        }
        None
    }

    fn configuration_list_comment(&self, id: &str) -> Option<String> {
        let objects = self.objects?;
        for (_, value) in objects.iter() {
            let Some(obj) = value.as_dict() else { continue };
            if obj.get_str("buildConfigurationList") != Some(id) {
                continue;
            }
            let owner_isa = obj.get_str("isa")?;
            return Some(match self.display_name(obj) {
                Some(name) => format!("Build configuration list for {owner_isa} \"{name}\""),
                None => format!("Build configuration list for {owner_isa}"),
            });
        }
        None
    }
}

fn phase_display_name(isa: &str, obj: &Dict) -> String {
    if let Some(name) = obj.get_str("name") {
        return name.to_string();
    }
    let stripped = isa
        .strip_prefix("PBX")
        .unwrap_or(isa)
        .strip_suffix("BuildPhase")
        .unwrap_or(isa);
    stripped.to_string()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn push_tabs(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push('\t');
    }
}

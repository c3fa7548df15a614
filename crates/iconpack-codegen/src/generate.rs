use crate::ident::{CollisionPolicy, IdentifierAllocator};
use crate::normalize::{append_to_open_tag, normalize, root_tag_span};
use crate::types::{AssetName, Identifier};
use crate::CodegenError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One icon image as delivered by the icon service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAsset {
    pub name: AssetName,
    pub markup: String,
}

impl RawAsset {
    pub fn new(name: impl Into<AssetName>, markup: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markup: markup.into(),
        }
    }
}

/// Everything generated for one icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentArtifactSet {
    pub identifier: Identifier,
    pub untyped_source: String,
    pub typed_source: String,
    pub declaration_source: String,
    pub untyped_export_line: String,
    pub typed_export_line: String,
}

impl ComponentArtifactSet {
    pub fn untyped_file_name(&self) -> String {
        format!("{}.jsx", self.identifier)
    }

    pub fn typed_file_name(&self) -> String {
        format!("{}.tsx", self.identifier)
    }

    pub fn declaration_file_name(&self) -> String {
        format!("{}.d.ts", self.identifier)
    }
}

const UNTYPED_ROOT_PROPS: &str = "{...props}";
const TYPED_ROOT_PROPS: &str = "height={height} width={width} {...rest}";

/// Re-export line for a barrel file.
pub fn export_line(identifier: &Identifier) -> String {
    format!("export {{ default as {identifier} }} from \"./{identifier}\";")
}

/// Produce the untyped component, typed component, declaration and export
/// lines for already-normalized markup.
///
/// The prop spread is placed last inside the root tag so caller-supplied
/// attributes override the templated ones.
pub fn generate(identifier: &Identifier, normalized_markup: &str) -> ComponentArtifactSet {
    let untyped_markup = augment_root(normalized_markup, UNTYPED_ROOT_PROPS);
    let typed_markup = augment_root(normalized_markup, TYPED_ROOT_PROPS);

    let untyped_source = format!(
        r#"import React from "react";

const {identifier} = (props) => (
  {untyped_markup}
);

export default {identifier};
"#
    );

    let typed_source = format!(
        r#"import * as React from "react";
import type {{ SVGProps }} from "react";

interface IProps extends SVGProps<SVGSVGElement> {{
  height: number | string;
  width: number | string;
}}

const {identifier}: React.FC<IProps> = (props) => {{
  const {{ height, width, ...rest }} = props;
  return (
    {typed_markup}
  );
}};

export default {identifier};
"#
    );

    let declaration_source = format!(
        r#"import * as React from "react";
import type {{ SVGProps }} from "react";

export interface IProps extends SVGProps<SVGSVGElement> {{
  height: number | string;
  width: number | string;
}}

declare const {identifier}: React.FC<IProps>;
export default {identifier};
"#
    );

    let line = export_line(identifier);
    ComponentArtifactSet {
        identifier: identifier.clone(),
        untyped_source,
        typed_source,
        declaration_source,
        untyped_export_line: line.clone(),
        typed_export_line: line,
    }
}

fn augment_root(markup: &str, props: &str) -> String {
    let Some(span) = root_tag_span(markup) else {
        return markup.to_owned();
    };
    let mut out = String::with_capacity(markup.len() + props.len() + 1);
    out.push_str(&markup[..span.start]);
    out.push_str(&append_to_open_tag(&markup[span.clone()], props));
    out.push_str(&markup[span.end..]);
    out
}

/// Normalize, name and generate every asset in delivery order.
pub fn generate_all(
    assets: &[RawAsset],
    policy: CollisionPolicy,
) -> Result<Vec<ComponentArtifactSet>, CodegenError> {
    let mut allocator = IdentifierAllocator::new(policy);
    let mut out = Vec::with_capacity(assets.len());
    for asset in assets {
        let identifier = allocator.allocate(&asset.name)?;
        if root_tag_span(&asset.markup).is_none() {
            warn!("asset '{}' has no <svg> root, embedding as-is", asset.name);
        }
        let normalized = normalize(&asset.markup);
        debug!("generating {identifier} from '{}'", asset.name);
        out.push(generate(&identifier, &normalized));
    }
    Ok(out)
}

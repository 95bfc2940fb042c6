//! `/rw/motionsystem`: joint and Cartesian target queries.

use crate::catalog::Coordinate;
use crate::error::{Error, Result};

use super::panel::find_class_text;
use super::Client;

/// The rotational position of every axis of a mechanical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTarget {
    pub robax: Vec<f64>,
    pub extax: Vec<f64>,
}

/// A Cartesian pose and orientation, relative to the requested coordinate
/// system.
#[derive(Debug, Clone, PartialEq)]
pub struct RobTarget {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl Client {
    /// `GET /rw/motionsystem/mechunits/{mechunit}/jointtarget`.
    pub async fn get_mechanical_unit_joint_target(&self, mechunit: &str) -> Result<JointTarget> {
        let path = format!("/rw/motionsystem/mechunits/{mechunit}/jointtarget");
        let response = self.decode_get(&path).await?;
        let doc = response.document()?;

        let robax = ["rax_1", "rax_2", "rax_3", "rax_4", "rax_5", "rax_6"]
            .iter()
            .map(|field| parse_required_field(&doc, field))
            .collect::<Result<Vec<_>>>()?;
        let extax = ["eax_a", "eax_b", "eax_c", "eax_d", "eax_e", "eax_f"]
            .iter()
            .map(|field| parse_required_field(&doc, field))
            .collect::<Result<Vec<_>>>()?;

        Ok(JointTarget { robax, extax })
    }

    /// `GET /rw/motionsystem/mechunits/{mechunit}/robtarget`, with the
    /// `coordinate`, `tool`, and `wobj` query parameters the controller uses
    /// to resolve the pose against. Empty `tool`/`wobj` select the
    /// controller's defaults.
    pub async fn get_mechanical_unit_rob_target(
        &self,
        mechunit: &str,
        coordinate: Coordinate,
        tool: &str,
        wobj: &str,
    ) -> Result<RobTarget> {
        let path = format!(
            "/rw/motionsystem/mechunits/{mechunit}/robtarget?coordinate={}&tool={tool}&wobj={wobj}",
            coordinate.to_wire_str()
        );
        let response = self.decode_get(&path).await?;
        let doc = response.document()?;

        let translation = [
            parse_required_field(&doc, "x")?,
            parse_required_field(&doc, "y")?,
            parse_required_field(&doc, "z")?,
        ];
        let rotation = [
            parse_required_field(&doc, "q1")?,
            parse_required_field(&doc, "q2")?,
            parse_required_field(&doc, "q3")?,
            parse_required_field(&doc, "q4")?,
        ];

        Ok(RobTarget { translation, rotation })
    }
}

fn parse_required_field(doc: &roxmltree::Document<'_>, class: &str) -> Result<f64> {
    let text = find_class_text(doc, class)
        .ok_or_else(|| Error::protocol_simple(format!("{class} element missing from response")))?;
    text.parse::<f64>()
        .map_err(|_| Error::protocol_simple(format!("{class} value {text:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_field() {
        let xml = r#"<html><body><div><span class="x">12.5</span></div></body></html>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(parse_required_field(&doc, "x").unwrap(), 12.5);
        assert!(parse_required_field(&doc, "y").is_err());
    }
}

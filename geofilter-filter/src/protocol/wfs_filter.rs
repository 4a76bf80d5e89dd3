// Copyright 2025 The GeoFilter Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! WFS 1.1.0 `GetFeature` bodies with OGC filter encoding.
//!
//! Rules become `ogc:` comparison operators; several rules are joined with
//! `ogc:And`, list values of one rule with `ogc:Or`. Map extent and filter
//! geometry become `ogc:BBOX` and `ogc:Intersects`.

use geofilter_common::DateFormatUtils::DateFormat;
use geofilter_error::GeoFilterResult;
use geofilter_error::RuleError;
use quick_xml::escape::escape;
use serde_json::Value;
use tracing::warn;

use crate::feature::Extent;
use crate::rule::AttrName;
use crate::rule::Operator;
use crate::rule::Rule;
use crate::rule::RuleValue;
use crate::service::WfsService;

const WFS_NS: &str = "http://www.opengis.net/wfs";
const OGC_NS: &str = "http://www.opengis.net/ogc";
const GML_NS: &str = "http://www.opengis.net/gml";

/// A `wfs:GetFeature` POST body.
#[derive(Debug, Clone, Default)]
pub struct GetFeatureRequest {
    version: String,
    typename: String,
    feature_prefix: Option<String>,
    feature_ns: Option<String>,
    srs_name: Option<String>,
    property_names: Vec<String>,
    clauses: Vec<String>,
}

impl GetFeatureRequest {
    pub fn for_service(service: &WfsService, version: &str) -> Self {
        Self {
            version: version.to_string(),
            typename: service.qualified_typename(),
            feature_prefix: service.feature_prefix.clone().filter(|prefix| !prefix.is_empty()),
            feature_ns: service.feature_ns.clone(),
            srs_name: service.srs_name.clone(),
            ..Default::default()
        }
    }

    pub fn with_property_name(mut self, name: &str) -> Self {
        let name = self.qualify(name);
        self.property_names.push(name);
        self
    }

    /// Adds one clause per rule. Rules that cannot be expressed are skipped.
    pub fn with_rules(mut self, rules: &[Rule]) -> GeoFilterResult<Self> {
        for rule in rules {
            if let Some(clause) = self.rule_clause(rule)? {
                self.clauses.push(clause);
            }
        }
        Ok(self)
    }

    /// Restricts the result to features whose geometry overlaps `extent`.
    pub fn with_bbox(mut self, geometry_name: &str, extent: &Extent, srs_name: Option<&str>) -> Self {
        let clause = format!(
            "<ogc:BBOX>{}<gml:Envelope{}><gml:lowerCorner>{} {}</gml:lowerCorner><gml:upperCorner>{} {}</gml:upperCorner></gml:Envelope></ogc:BBOX>",
            self.property(geometry_name),
            srs_attribute(srs_name),
            extent[0],
            extent[1],
            extent[2],
            extent[3]
        );
        self.clauses.push(clause);
        self
    }

    /// Restricts the result to features intersecting a GeoJSON geometry.
    pub fn with_intersects(mut self, geometry_name: &str, geometry: &Value, srs_name: Option<&str>) -> Self {
        match gml_geometry(geometry, srs_name) {
            Some(gml) => {
                let clause = format!("<ogc:Intersects>{}{}</ogc:Intersects>", self.property(geometry_name), gml);
                self.clauses.push(clause);
            }
            None => warn!(
                "geometry of type {:?} cannot be sent to a WFS, skipping the intersects clause",
                geometry.get("type")
            ),
        }
        self
    }

    pub fn has_filter(&self) -> bool {
        !self.clauses.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512);
        xml.push_str(&format!(
            "<wfs:GetFeature xmlns:wfs=\"{WFS_NS}\" xmlns:ogc=\"{OGC_NS}\" xmlns:gml=\"{GML_NS}\" service=\"WFS\" version=\"{}\"",
            escape(&self.version)
        ));
        xml.push('>');

        xml.push_str(&format!("<wfs:Query typeName=\"{}\"", escape(&self.typename)));
        if let (Some(prefix), Some(ns)) = (&self.feature_prefix, &self.feature_ns) {
            xml.push_str(&format!(" xmlns:{}=\"{}\"", escape(prefix), escape(ns)));
        }
        xml.push_str(&srs_attribute(self.srs_name.as_deref()));
        xml.push('>');

        for name in &self.property_names {
            xml.push_str(&format!("<wfs:PropertyName>{}</wfs:PropertyName>", escape(name)));
        }
        if self.has_filter() {
            xml.push_str("<ogc:Filter>");
            xml.push_str(&join("And", self.clauses.clone()));
            xml.push_str("</ogc:Filter>");
        }
        xml.push_str("</wfs:Query></wfs:GetFeature>");
        xml
    }

    fn qualify(&self, name: &str) -> String {
        match &self.feature_prefix {
            Some(prefix) if !name.contains(':') => format!("{prefix}:{name}"),
            _ => name.to_string(),
        }
    }

    fn property(&self, name: &str) -> String {
        format!("<ogc:PropertyName>{}</ogc:PropertyName>", escape(&self.qualify(name)))
    }

    fn rule_clause(&self, rule: &Rule) -> GeoFilterResult<Option<String>> {
        rule.validate()?;
        let format = rule.date_format();
        let values = rule.value.as_ref().map(RuleValue::as_slice).unwrap_or_default();

        if rule.operator.is_range() {
            if let Some(format) = format.as_ref().filter(|format| !format.is_iso8601()) {
                warn!(
                    "date format {} cannot be compared by the server with {}, dropping the rule on {}",
                    format.as_str(),
                    rule.operator,
                    rule.attr_name.first()
                );
                return Ok(None);
            }
            return Ok(Some(self.range_clause(rule, values, format.as_ref())));
        }

        let literals: Vec<String> = values.iter().map(|value| literal(value, format.as_ref())).collect();
        let clause = match (rule.operator, literals.as_slice()) {
            (_, []) => return Ok(None),
            (Operator::Ne, literals) => join(
                "And",
                literals
                    .iter()
                    .map(|value| self.comparison("PropertyIsNotEqualTo", rule.attr_name.first(), value))
                    .collect(),
            ),
            (Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le, [value]) => {
                self.comparison(comparison_element(rule.operator), rule.attr_name.first(), value)
            }
            (Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le, literals) => {
                return Err(RuleError::value_arity(rule.operator.as_str(), 1, literals.len()).into());
            }
            (operator, literals) => join(
                "Or",
                literals
                    .iter()
                    .map(|value| self.match_clause(operator, rule.attr_name.first(), value))
                    .collect(),
            ),
        };
        Ok(Some(clause))
    }

    fn match_clause(&self, operator: Operator, attr: &str, value: &str) -> String {
        match operator {
            Operator::In => self.like(attr, &format!("*{}*", escape_like(value))),
            Operator::StartsWith => self.like(attr, &format!("{}*", escape_like(value))),
            Operator::EndsWith => self.like(attr, &format!("*{}", escape_like(value))),
            _ => self.comparison("PropertyIsEqualTo", attr, value),
        }
    }

    fn range_clause(&self, rule: &Rule, values: &[Value], format: Option<&DateFormat>) -> String {
        let literals: Vec<String> = values.iter().map(|value| literal(value, format)).collect();
        let (low, high) = match literals.as_slice() {
            [low, high] => (low.as_str(), high.as_str()),
            [value] => (value.as_str(), value.as_str()),
            _ => ("", ""),
        };
        let (attr_a, attr_b) = (rule.attr_name.first(), rule.attr_name.second());

        match (rule.operator, &rule.attr_name) {
            (Operator::Between, AttrName::Single(attr)) if format.is_some() => format!(
                "<ogc:During>{}<gml:TimePeriod><gml:begin><gml:TimeInstant><gml:timePosition>{}</gml:timePosition></gml:TimeInstant></gml:begin><gml:end><gml:TimeInstant><gml:timePosition>{}</gml:timePosition></gml:TimeInstant></gml:end></gml:TimePeriod></ogc:During>",
                self.property(attr),
                escape(low),
                escape(high)
            ),
            (Operator::Between, AttrName::Single(attr)) => format!(
                "<ogc:PropertyIsBetween>{}<ogc:LowerBoundary><ogc:Literal>{}</ogc:Literal></ogc:LowerBoundary><ogc:UpperBoundary><ogc:Literal>{}</ogc:Literal></ogc:UpperBoundary></ogc:PropertyIsBetween>",
                self.property(attr),
                escape(low),
                escape(high)
            ),
            // the feature range lies inside the rule range
            (Operator::Between, AttrName::Range(..)) => join(
                "And",
                vec![
                    self.comparison("PropertyIsGreaterThanOrEqualTo", attr_a, low),
                    self.comparison("PropertyIsLessThanOrEqualTo", attr_b, high),
                ],
            ),
            // the feature range overlaps the rule range
            _ => join(
                "And",
                vec![
                    self.comparison("PropertyIsLessThanOrEqualTo", attr_a, high),
                    self.comparison("PropertyIsGreaterThanOrEqualTo", attr_b, low),
                ],
            ),
        }
    }

    fn comparison(&self, element: &str, attr: &str, value: &str) -> String {
        let match_case = if element == "PropertyIsEqualTo" || element == "PropertyIsNotEqualTo" {
            " matchCase=\"false\""
        } else {
            ""
        };
        format!(
            "<ogc:{element}{match_case}>{}<ogc:Literal>{}</ogc:Literal></ogc:{element}>",
            self.property(attr),
            escape(value)
        )
    }

    fn like(&self, attr: &str, pattern: &str) -> String {
        format!(
            "<ogc:PropertyIsLike wildCard=\"*\" singleChar=\".\" escapeChar=\"!\" matchCase=\"false\">{}<ogc:Literal>{}</ogc:Literal></ogc:PropertyIsLike>",
            self.property(attr),
            escape(pattern)
        )
    }
}

fn comparison_element(operator: Operator) -> &'static str {
    match operator {
        Operator::Gt => "PropertyIsGreaterThan",
        Operator::Ge => "PropertyIsGreaterThanOrEqualTo",
        Operator::Lt => "PropertyIsLessThan",
        Operator::Le => "PropertyIsLessThanOrEqualTo",
        Operator::Ne => "PropertyIsNotEqualTo",
        _ => "PropertyIsEqualTo",
    }
}

fn join(operator: &str, mut clauses: Vec<String>) -> String {
    if clauses.len() == 1 {
        return clauses.remove(0);
    }
    format!("<ogc:{operator}>{}</ogc:{operator}>", clauses.concat())
}

/// Literal text of a rule value, dates rewritten to ISO-8601 when a format is given.
fn literal(value: &Value, format: Option<&DateFormat>) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    match format {
        Some(format) if !format.is_iso8601() => format.to_iso(&text).unwrap_or(text),
        _ => text,
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '!' | '*' | '.') {
            escaped.push('!');
        }
        escaped.push(ch);
    }
    escaped
}

fn srs_attribute(srs_name: Option<&str>) -> String {
    srs_name
        .filter(|srs| !srs.is_empty())
        .map(|srs| format!(" srsName=\"{}\"", escape(srs)))
        .unwrap_or_default()
}

fn pos_list(ring: &Value) -> Option<String> {
    let coordinates: Vec<String> = ring
        .as_array()?
        .iter()
        .filter_map(|position| {
            let position = position.as_array()?;
            Some(format!("{} {}", position.first()?.as_f64()?, position.get(1)?.as_f64()?))
        })
        .collect();
    (!coordinates.is_empty()).then(|| coordinates.join(" "))
}

fn gml_polygon(rings: &Value, srs_name: Option<&str>) -> Option<String> {
    let mut rings = rings.as_array()?.iter();
    let mut polygon = format!(
        "<gml:Polygon{}><gml:exterior><gml:LinearRing><gml:posList>{}</gml:posList></gml:LinearRing></gml:exterior>",
        srs_attribute(srs_name),
        pos_list(rings.next()?)?
    );
    for interior in rings.filter_map(pos_list) {
        polygon.push_str(&format!(
            "<gml:interior><gml:LinearRing><gml:posList>{interior}</gml:posList></gml:LinearRing></gml:interior>"
        ));
    }
    polygon.push_str("</gml:Polygon>");
    Some(polygon)
}

fn gml_geometry(geometry: &Value, srs_name: Option<&str>) -> Option<String> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => gml_polygon(coordinates, srs_name),
        "MultiPolygon" => {
            let members: Vec<String> = coordinates
                .as_array()?
                .iter()
                .filter_map(|rings| gml_polygon(rings, None))
                .map(|polygon| format!("<gml:surfaceMember>{polygon}</gml:surfaceMember>"))
                .collect();
            (!members.is_empty()).then(|| {
                format!(
                    "<gml:MultiSurface{}>{}</gml:MultiSurface>",
                    srs_attribute(srs_name),
                    members.concat()
                )
            })
        }
        "Point" => {
            let position = pos_list(&Value::Array(vec![coordinates.clone()]))?;
            Some(format!("<gml:Point{}><gml:pos>{position}</gml:pos></gml:Point>", srs_attribute(srs_name)))
        }
        _ => None,
    }
}

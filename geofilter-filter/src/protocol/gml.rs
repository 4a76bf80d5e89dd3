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

//! GML feature collections and XML schema documents returned by WFS.

use geofilter_error::GeoFilterError;
use geofilter_error::GeoFilterResult;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use crate::feature::AttrType;
use crate::feature::AttrTypes;
use crate::feature::Feature;
use crate::protocol::xml::parse_document;
use crate::protocol::xml::strip_prefix;
use crate::protocol::xml::XmlNode;

/// Reads the features of a `GetFeature` response.
///
/// Simple child elements become string properties (empty elements become
/// null). The first child holding a GML Point, LineString or Polygon becomes
/// the GeoJSON geometry.
pub fn parse_feature_collection(xml: &str) -> GeoFilterResult<Vec<Feature>> {
    let root = parse_document(xml)?;
    if root.name.ends_with("ExceptionReport") {
        return Err(GeoFilterError::malformed("XML", exception_text(&root)));
    }
    let mut features = Vec::new();
    collect_members(&root, &mut features);
    Ok(features)
}

fn exception_text(report: &XmlNode) -> String {
    report
        .find("ExceptionText")
        .or_else(|| report.find("ServiceException"))
        .map(|node| node.text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "service exception".to_string())
}

fn collect_members(node: &XmlNode, features: &mut Vec<Feature>) {
    for child in &node.children {
        match child.name.as_str() {
            "featureMember" | "featureMembers" | "member" => {
                features.extend(child.children.iter().map(feature_from_node));
            }
            _ => collect_members(child, features),
        }
    }
}

fn feature_from_node(node: &XmlNode) -> Feature {
    let mut properties = Map::new();
    let mut geometry = None;
    for child in &node.children {
        if child.is_leaf() {
            let value = if child.text.is_empty() {
                Value::Null
            } else {
                Value::String(child.text.clone())
            };
            properties.insert(child.name.clone(), value);
        } else if geometry.is_none() {
            geometry = child.children.first().and_then(gml_geometry);
        }
    }
    Feature {
        id: node.attr("id").or_else(|| node.attr("fid")).map(|id| Value::String(id.to_string())),
        properties,
        geometry,
    }
}

fn gml_geometry(node: &XmlNode) -> Option<Value> {
    match node.name.as_str() {
        "Point" => Some(json!({"type": "Point", "coordinates": positions(node)?.first()?})),
        "LineString" => Some(json!({"type": "LineString", "coordinates": positions(node)?})),
        "Polygon" => Some(json!({"type": "Polygon", "coordinates": polygon_rings(node)?})),
        "MultiSurface" | "MultiPolygon" => {
            let polygons: Vec<Value> = node
                .descendants_named("Polygon")
                .into_iter()
                .filter_map(|polygon| polygon_rings(polygon).map(|rings| json!(rings)))
                .collect();
            (!polygons.is_empty()).then(|| json!({"type": "MultiPolygon", "coordinates": polygons}))
        }
        _ => None,
    }
}

fn polygon_rings(polygon: &XmlNode) -> Option<Vec<Vec<[f64; 2]>>> {
    let mut rings = vec![positions(polygon.find("exterior")?)?];
    for interior in polygon.children_named("interior") {
        rings.push(positions(interior)?);
    }
    Some(rings)
}

/// Coordinates of the first `pos`, `posList` or `coordinates` element at or below `node`.
fn positions(node: &XmlNode) -> Option<Vec<[f64; 2]>> {
    let (list, dimension) = if let Some(pos_list) = node.find("posList") {
        let dimension = pos_list.attr("srsDimension").and_then(|d| d.parse().ok()).unwrap_or(2);
        (pos_list.text.clone(), dimension)
    } else if let Some(pos) = node.find("pos") {
        let dimension = pos.text.split_whitespace().count().max(2);
        (pos.text.clone(), dimension)
    } else {
        // GML 2 coordinates: "x,y x,y"
        let coordinates = node.find("coordinates")?;
        (coordinates.text.replace(',', " "), 2)
    };
    let numbers: Vec<f64> = list
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let points: Vec<[f64; 2]> = numbers
        .chunks_exact(dimension.max(2))
        .map(|chunk| [chunk[0], chunk[1]])
        .collect();
    (!points.is_empty()).then_some(points)
}

/// Reads attribute types of `typename` from a `DescribeFeatureType` schema.
///
/// The feature element may declare its complex type inline or by reference.
pub fn parse_describe_feature_type(xml: &str, typename: &str) -> GeoFilterResult<AttrTypes> {
    let schema = parse_document(xml)?;
    let local_name = strip_prefix(typename);
    let element = schema
        .children_named("element")
        .find(|element| element.attr("name") == Some(local_name))
        .ok_or_else(|| GeoFilterError::type_name_not_found(typename))?;

    let complex_type = match element.child("complexType") {
        Some(inline) => inline,
        None => {
            let type_name = element
                .attr("type")
                .map(strip_prefix)
                .ok_or_else(|| GeoFilterError::type_name_not_found(typename))?;
            schema
                .children_named("complexType")
                .find(|complex| complex.attr("name") == Some(type_name))
                .ok_or_else(|| GeoFilterError::type_name_not_found(typename))?
        }
    };

    let mut types = AttrTypes::new();
    for element in complex_type.descendants_named("element") {
        let Some(name) = element.attr("name") else {
            continue;
        };
        let xsd_type = element
            .attr("type")
            .or_else(|| element.find("restriction").and_then(|restriction| restriction.attr("base")));
        let attr_type = xsd_type.map_or(AttrType::Other("unknown".to_string()), AttrType::from_xsd);
        types.insert(name.to_string(), attr_type);
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_FEATURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:app="http://www.deegree.org/app">
  <gml:featureMember>
    <app:kitas gml:id="kitas.1">
      <app:name>Kita Sonnenschein</app:name>
      <app:plaetze>40</app:plaetze>
      <app:bemerkung/>
      <app:geom><gml:Point srsName="EPSG:25832"><gml:pos>565000.5 5935000.25</gml:pos></gml:Point></app:geom>
    </app:kitas>
  </gml:featureMember>
  <gml:featureMembers>
    <app:kitas gml:id="kitas.2">
      <app:name>Kita Regenbogen</app:name>
      <app:geom><gml:Polygon><gml:exterior><gml:LinearRing><gml:posList srsDimension="2">0 0 1 0 1 1 0 0</gml:posList></gml:LinearRing></gml:exterior></gml:Polygon></app:geom>
    </app:kitas>
    <app:kitas gml:id="kitas.3"><app:name>Kita &amp; Hort</app:name></app:kitas>
  </gml:featureMembers>
</wfs:FeatureCollection>"#;

    #[test]
    fn reads_members_properties_and_geometry() {
        let features = parse_feature_collection(GET_FEATURE).unwrap();
        assert_eq!(features.len(), 3);

        let first = &features[0];
        assert_eq!(first.id, Some(json!("kitas.1")));
        assert_eq!(first.property("name"), Some(&json!("Kita Sonnenschein")));
        assert_eq!(first.property("plaetze"), Some(&json!("40")));
        assert_eq!(first.property("bemerkung"), Some(&Value::Null));
        assert!(first.property("geom").is_none());
        assert_eq!(
            first.geometry,
            Some(json!({"type": "Point", "coordinates": [565000.5, 5935000.25]}))
        );

        assert_eq!(
            features[1].geometry,
            Some(json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}))
        );
        assert_eq!(features[2].property("name"), Some(&json!("Kita & Hort")));
    }

    #[test]
    fn exception_report_is_an_error() {
        let xml = r#"<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows"><ows:Exception><ows:ExceptionText>Unknown type</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"#;
        let err = parse_feature_collection(xml).unwrap_err();
        assert_eq!(err, GeoFilterError::malformed("XML", "Unknown type"));
    }

    #[test]
    fn empty_collection() {
        let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" numberOfFeatures="0"/>"#;
        assert!(parse_feature_collection(xml).unwrap().is_empty());
    }

    const DESCRIBE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:gml="http://www.opengis.net/gml" xmlns:app="http://www.deegree.org/app">
  <xsd:element name="kitas" type="app:kitasType" substitutionGroup="gml:_Feature"/>
  <xsd:complexType name="kitasType">
    <xsd:complexContent>
      <xsd:extension base="gml:AbstractFeatureType">
        <xsd:sequence>
          <xsd:element name="name" type="xsd:string" minOccurs="0"/>
          <xsd:element name="plaetze" type="xsd:int" minOccurs="0"/>
          <xsd:element name="eroeffnet" type="xsd:date" minOccurs="0"/>
          <xsd:element name="inklusiv" type="xsd:boolean" minOccurs="0"/>
          <xsd:element name="traeger">
            <xsd:simpleType><xsd:restriction base="xsd:string"><xsd:maxLength value="80"/></xsd:restriction></xsd:simpleType>
          </xsd:element>
          <xsd:element name="geom" type="gml:GeometryPropertyType" minOccurs="0"/>
        </xsd:sequence>
      </xsd:extension>
    </xsd:complexContent>
  </xsd:complexType>
  <xsd:element name="inline">
    <xsd:complexType><xsd:sequence><xsd:element name="flaeche" type="xsd:double"/></xsd:sequence></xsd:complexType>
  </xsd:element>
</xsd:schema>"#;

    #[test]
    fn describe_feature_type_by_reference() {
        let types = parse_describe_feature_type(DESCRIBE, "app:kitas").unwrap();
        assert_eq!(types.len(), 6);
        assert_eq!(types["name"], AttrType::String);
        assert_eq!(types["plaetze"], AttrType::Number);
        assert_eq!(types["eroeffnet"], AttrType::Date);
        assert_eq!(types["inklusiv"], AttrType::Boolean);
        assert_eq!(types["traeger"], AttrType::String);
        assert_eq!(types["geom"], AttrType::Geometry);
    }

    #[test]
    fn describe_feature_type_inline() {
        let types = parse_describe_feature_type(DESCRIBE, "inline").unwrap();
        assert_eq!(types["flaeche"], AttrType::Number);
    }

    #[test]
    fn missing_type_name() {
        let err = parse_describe_feature_type(DESCRIBE, "app:schulen").unwrap_err();
        assert_eq!(err, GeoFilterError::type_name_not_found("app:schulen"));
    }
}

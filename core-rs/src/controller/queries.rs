//! The four fixed SPARQL queries behind controller configuration
//!
//! Location and point links are matched in both directions, so the queries
//! work on a KG that has not been through the reasoner.

use crate::ontology::SparqlQuery;

pub const BRICK_NS: &str = "https://brickschema.org/schema/Brick#";
pub const REC_NS: &str = "https://w3id.org/rec#";

const PREFIXES: &str = r#"
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX brick: <https://brickschema.org/schema/Brick#>
PREFIX rec: <https://w3id.org/rec#>
"#;

fn with_prefixes(body: &str) -> SparqlQuery {
    SparqlQuery::new(format!("{}{}", PREFIXES, body))
}

/// `?room`
pub fn rooms() -> SparqlQuery {
    with_prefixes(
        r#"
        SELECT DISTINCT ?room
        WHERE {
            { ?room a brick:Room } UNION { ?room a rec:Room }
            FILTER(isIRI(?room))
        }
        ORDER BY ?room
        "#,
    )
}

/// `?room ?device [?point ?actuation_access]`
pub fn ventilation_devices() -> SparqlQuery {
    with_prefixes(
        r#"
        SELECT DISTINCT ?room ?device ?point ?actuation_access
        WHERE {
            ?device a ?device_class .
            FILTER(?device_class IN (brick:HVAC_Equipment, brick:Fan,
                                     brick:Ventilation_Air_System, brick:Air_Handling_Unit))
            { ?device brick:hasLocation ?room } UNION { ?room brick:isLocationOf ?device }
            OPTIONAL {
                { ?device brick:hasPoint ?point } UNION { ?point brick:isPointOf ?device }
                ?point a ?point_class .
                FILTER(?point_class IN (brick:Setpoint, brick:Command))
                ?point rdf:value ?actuation_access .
            }
        }
        ORDER BY ?room ?device ?point ?actuation_access
        "#,
    )
}

/// `?room ?sensor [?sensor_access]`
pub fn co2_sensors() -> SparqlQuery {
    sensors("brick:CO2_Sensor")
}

/// `?room ?sensor [?sensor_access]`
pub fn presence_sensors() -> SparqlQuery {
    sensors("brick:Occupancy_Sensor, brick:Motion_Sensor, brick:Presence_Sensor")
}

fn sensors(classes: &str) -> SparqlQuery {
    with_prefixes(&format!(
        r#"
        SELECT DISTINCT ?room ?sensor ?sensor_access
        WHERE {{
            ?sensor a ?sensor_class .
            FILTER(?sensor_class IN ({}))
            {{ ?sensor brick:hasLocation ?room }} UNION {{ ?sensor brick:isPointOf ?room }}
            UNION {{ ?room brick:isLocationOf ?sensor }} UNION {{ ?room brick:hasPoint ?sensor }}
            OPTIONAL {{ ?sensor rdf:value ?sensor_access }}
        }}
        ORDER BY ?room ?sensor ?sensor_access
        "#,
        classes
    ))
}

//! Trip export mapper
//!
//! Flattens a namespaced rittenadministratie XML export into [`TripRecord`]s:
//! - every `Rit` element below the document root that has a `Data` child
//!   becomes one record, in document order
//! - each column is looked up by a fixed element path under `Data`
//! - a missing element anywhere on a path yields `""` for that column only

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Result, RittenError};
use crate::models::{TripField, TripRecord};

/// Namespace of the trip elements.
pub const RIT_NAMESPACE: &str = "http://www.ritadministratie.org";

/// Envelope namespace declared by exports; no element from it is read.
pub const ENVELOPE_NAMESPACE: &str = "urn:envelope";

/// Decode an uploaded body as UTF-8 and map it.
pub fn parse_trips_bytes(content: &[u8]) -> Result<Vec<TripRecord>> {
    let xml = std::str::from_utf8(content)
        .map_err(|e| RittenError::Parse(format!("invalid UTF-8 input: {}", e)))?;
    parse_trips(xml)
}

/// Map XML text to trip records.
///
/// Internal DTDs are accepted and their entities expanded. Malformed XML is a
/// [`RittenError::Parse`]; hitting one of the parser's resource limits is a
/// [`RittenError::Processing`].
pub fn parse_trips(xml: &str) -> Result<Vec<TripRecord>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options).map_err(classify_xml_error)?;
    let root = doc.root_element();

    let trips: Vec<TripRecord> = root
        .descendants()
        .filter(|node| *node != root && node.has_tag_name((RIT_NAMESPACE, "Rit")))
        .filter_map(|rit| child(rit, "Data"))
        .map(map_trip)
        .collect();

    tracing::debug!(count = trips.len(), "Mapped trip records");
    Ok(trips)
}

fn map_trip(data: Node<'_, '_>) -> TripRecord {
    TripRecord::from_fields(|field: TripField| lookup(data, field.source_path()))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.has_tag_name((RIT_NAMESPACE, name)))
}

/// Follow `path` from `node`; `""` when any segment or the text is absent.
fn lookup(node: Node<'_, '_>, path: &[&str]) -> String {
    path.iter()
        .try_fold(node, |current, segment| child(current, segment))
        .and_then(|leaf| leaf.text())
        .map(str::to_string)
        .unwrap_or_default()
}

fn classify_xml_error(err: roxmltree::Error) -> RittenError {
    match err {
        roxmltree::Error::NodesLimitReached
        | roxmltree::Error::AttributesLimitReached
        | roxmltree::Error::NamespacesLimitReached => RittenError::Processing(err.to_string()),
        other => RittenError::Parse(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rit(body: &str) -> String {
        format!("<Rit>{}</Rit>", body)
    }

    fn full_data(id: &str, prijs: &str) -> String {
        format!(
            "<Data>\
               <RtVgNr>{id}</RtVgNr>\
               <DatTdReg>2024-05-01T08:15:00</DatTdReg>\
               <Type>Taxi</Type>\
               <Bestuurder><ChIdNr>CH-{id}</ChIdNr></Bestuurder>\
               <KmStdBeg>1200</KmStdBeg>\
               <KmStdEnd>1234</KmStdEnd>\
               <Prijs>{prijs}</Prijs>\
               <LocBeg><Lat>52.0907</Lat><Lon>5.1214</Lon></LocBeg>\
               <LocEnd><Lat>52.3676</Lat><Lon>4.9041</Lon></LocEnd>\
             </Data>"
        )
    }

    fn document(rits: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <env:Envelope xmlns:env=\"{ENVELOPE_NAMESPACE}\" xmlns=\"{RIT_NAMESPACE}\">\
               <env:Body><Ritten>{}</Ritten></env:Body>\
             </env:Envelope>",
            rits.concat()
        )
    }

    #[test]
    fn test_maps_every_field() {
        let xml = document(&[rit(&full_data("R1", "17.50"))]);
        let trips = parse_trips(&xml).unwrap();
        assert_eq!(trips.len(), 1);

        let t = &trips[0];
        assert_eq!(t.rit_id, "R1");
        assert_eq!(t.datum_tijd_registratie, "2024-05-01T08:15:00");
        assert_eq!(t.trip_type, "Taxi");
        assert_eq!(t.bestuurder_id, "CH-R1");
        assert_eq!(t.km_stand_begin, "1200");
        assert_eq!(t.km_stand_eind, "1234");
        assert_eq!(t.prijs, "17.50");
        assert_eq!(t.latitude_begin, "52.0907");
        assert_eq!(t.longitude_begin, "5.1214");
        assert_eq!(t.latitude_eind, "52.3676");
        assert_eq!(t.longitude_eind, "4.9041");
    }

    #[test]
    fn test_rit_without_data_is_skipped() {
        let xml = document(&[
            rit(&full_data("R1", "1")),
            rit("<Status>geannuleerd</Status>"),
            rit(&full_data("R2", "2")),
        ]);
        let trips = parse_trips(&xml).unwrap();
        let ids: Vec<&str> = trips.iter().map(|t| t.rit_id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R2"]);
    }

    #[test]
    fn test_missing_leaf_only_blanks_that_field() {
        let data = full_data("R9", "3.00").replace("<KmStdEnd>1234</KmStdEnd>", "");
        let trips = parse_trips(&document(&[rit(&data)])).unwrap();
        let t = &trips[0];
        assert_eq!(t.km_stand_eind, "");
        assert_eq!(t.km_stand_begin, "1200");
        assert_eq!(t.prijs, "3.00");
        assert_eq!(t.longitude_eind, "4.9041");
    }

    #[test]
    fn test_missing_group_blanks_nested_fields() {
        let data = full_data("R3", "4")
            .replace("<Bestuurder><ChIdNr>CH-R3</ChIdNr></Bestuurder>", "")
            .replace("<LocEnd><Lat>52.3676</Lat><Lon>4.9041</Lon></LocEnd>", "");
        let trips = parse_trips(&document(&[rit(&data)])).unwrap();
        let t = &trips[0];
        assert_eq!(t.bestuurder_id, "");
        assert_eq!(t.latitude_eind, "");
        assert_eq!(t.longitude_eind, "");
        assert_eq!(t.latitude_begin, "52.0907");
    }

    #[test]
    fn test_empty_data_yields_all_blank_record() {
        let trips = parse_trips(&document(&[rit("<Data/>")])).unwrap();
        assert_eq!(trips, vec![TripRecord::default()]);
    }

    #[test]
    fn test_elements_outside_namespace_are_ignored() {
        let xml = format!(
            "<root xmlns:ns=\"{RIT_NAMESPACE}\">\
               <Rit><Data><RtVgNr>no-ns</RtVgNr></Data></Rit>\
               <ns:Rit><ns:Data><ns:RtVgNr>ns</ns:RtVgNr><RtVgNr>x</RtVgNr></ns:Data></ns:Rit>\
             </root>"
        );
        let trips = parse_trips(&xml).unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].rit_id, "ns");
    }

    #[test]
    fn test_root_rit_is_not_selected() {
        let xml = format!(
            "<Rit xmlns=\"{RIT_NAMESPACE}\"><Data><RtVgNr>root</RtVgNr></Data>\
               <Rit><Data><RtVgNr>inner</RtVgNr></Data></Rit>\
             </Rit>"
        );
        let trips = parse_trips(&xml).unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].rit_id, "inner");
    }

    #[test]
    fn test_text_is_not_trimmed_or_coerced() {
        let data = "<Data><Prijs> 12,5 EUR </Prijs><KmStdBeg>abc</KmStdBeg></Data>";
        let trips = parse_trips(&document(&[rit(data)])).unwrap();
        assert_eq!(trips[0].prijs, " 12,5 EUR ");
        assert_eq!(trips[0].km_stand_begin, "abc");
    }

    #[test]
    fn test_document_without_trips_is_empty() {
        let trips = parse_trips(&document(&[])).unwrap();
        assert!(trips.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse_trips("<Ritten><Rit></Ritten>").unwrap_err();
        assert!(matches!(err, RittenError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_internal_dtd_entities_are_expanded() {
        let xml = format!(
            "<?xml version=\"1.0\"?>\
             <!DOCTYPE Ritten [<!ENTITY cur \"EUR\">]>\
             <Ritten xmlns=\"{RIT_NAMESPACE}\">\
               <Rit><Data><RtVgNr>R1</RtVgNr><Prijs>12 &cur;</Prijs></Data></Rit>\
             </Ritten>"
        );
        let trips = parse_trips(&xml).unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].rit_id, "R1");
        assert_eq!(trips[0].prijs, "12 EUR");
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse_trips_bytes(&[0x3c, 0xff, 0xfe, 0x3e]).unwrap_err();
        assert!(matches!(err, RittenError::Parse(_)));
    }

    #[test]
    fn test_bytes_entry_point_maps_trips() {
        let xml = document(&[rit(&full_data("B1", "9"))]);
        let trips = parse_trips_bytes(xml.as_bytes()).unwrap();
        assert_eq!(trips[0].rit_id, "B1");
    }
}

use serde::Serialize;

/// The eleven columns of a flattened trip, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripField {
    RitId,
    DatumTijdRegistratie,
    Type,
    BestuurderId,
    KmStandBegin,
    KmStandEind,
    Prijs,
    LatitudeBegin,
    LongitudeBegin,
    LatitudeEind,
    LongitudeEind,
}

impl TripField {
    pub const ALL: [TripField; 11] = [
        TripField::RitId,
        TripField::DatumTijdRegistratie,
        TripField::Type,
        TripField::BestuurderId,
        TripField::KmStandBegin,
        TripField::KmStandEind,
        TripField::Prijs,
        TripField::LatitudeBegin,
        TripField::LongitudeBegin,
        TripField::LatitudeEind,
        TripField::LongitudeEind,
    ];

    /// JSON key
    pub fn key(self) -> &'static str {
        match self {
            TripField::RitId => "rit_id",
            TripField::DatumTijdRegistratie => "datum_tijd_registratie",
            TripField::Type => "type",
            TripField::BestuurderId => "bestuurder_id",
            TripField::KmStandBegin => "km_stand_begin",
            TripField::KmStandEind => "km_stand_eind",
            TripField::Prijs => "prijs",
            TripField::LatitudeBegin => "latitude_begin",
            TripField::LongitudeBegin => "longitude_begin",
            TripField::LatitudeEind => "latitude_eind",
            TripField::LongitudeEind => "longitude_eind",
        }
    }

    /// Spreadsheet column header
    pub fn header(self) -> &'static str {
        match self {
            TripField::RitId => "Rit ID",
            TripField::DatumTijdRegistratie => "Datum Tijd Registratie",
            TripField::Type => "Type",
            TripField::BestuurderId => "Bestuurder ID",
            TripField::KmStandBegin => "Kilometerstand Begin",
            TripField::KmStandEind => "Kilometerstand Eind",
            TripField::Prijs => "Prijs",
            TripField::LatitudeBegin => "Latitude Begin",
            TripField::LongitudeBegin => "Longitude Begin",
            TripField::LatitudeEind => "Latitude Eind",
            TripField::LongitudeEind => "Longitude Eind",
        }
    }

    /// Element path below `Rit/Data` (local names, document namespace).
    pub fn source_path(self) -> &'static [&'static str] {
        match self {
            TripField::RitId => &["RtVgNr"],
            TripField::DatumTijdRegistratie => &["DatTdReg"],
            TripField::Type => &["Type"],
            TripField::BestuurderId => &["Bestuurder", "ChIdNr"],
            TripField::KmStandBegin => &["KmStdBeg"],
            TripField::KmStandEind => &["KmStdEnd"],
            TripField::Prijs => &["Prijs"],
            TripField::LatitudeBegin => &["LocBeg", "Lat"],
            TripField::LongitudeBegin => &["LocBeg", "Lon"],
            TripField::LatitudeEind => &["LocEnd", "Lat"],
            TripField::LongitudeEind => &["LocEnd", "Lon"],
        }
    }
}

/// One flattened trip. Every value is the raw element text, `""` when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TripRecord {
    pub rit_id: String,
    pub datum_tijd_registratie: String,
    #[serde(rename = "type")]
    pub trip_type: String,
    pub bestuurder_id: String,
    pub km_stand_begin: String,
    pub km_stand_eind: String,
    pub prijs: String,
    pub latitude_begin: String,
    pub longitude_begin: String,
    pub latitude_eind: String,
    pub longitude_eind: String,
}

impl TripRecord {
    /// Build a record by asking `value_of` for every field in column order.
    pub fn from_fields(mut value_of: impl FnMut(TripField) -> String) -> Self {
        let mut record = TripRecord::default();
        for field in TripField::ALL {
            *record.field_mut(field) = value_of(field);
        }
        record
    }

    pub fn get(&self, field: TripField) -> &str {
        match field {
            TripField::RitId => &self.rit_id,
            TripField::DatumTijdRegistratie => &self.datum_tijd_registratie,
            TripField::Type => &self.trip_type,
            TripField::BestuurderId => &self.bestuurder_id,
            TripField::KmStandBegin => &self.km_stand_begin,
            TripField::KmStandEind => &self.km_stand_eind,
            TripField::Prijs => &self.prijs,
            TripField::LatitudeBegin => &self.latitude_begin,
            TripField::LongitudeBegin => &self.longitude_begin,
            TripField::LatitudeEind => &self.latitude_eind,
            TripField::LongitudeEind => &self.longitude_eind,
        }
    }

    fn field_mut(&mut self, field: TripField) -> &mut String {
        match field {
            TripField::RitId => &mut self.rit_id,
            TripField::DatumTijdRegistratie => &mut self.datum_tijd_registratie,
            TripField::Type => &mut self.trip_type,
            TripField::BestuurderId => &mut self.bestuurder_id,
            TripField::KmStandBegin => &mut self.km_stand_begin,
            TripField::KmStandEind => &mut self.km_stand_eind,
            TripField::Prijs => &mut self.prijs,
            TripField::LatitudeBegin => &mut self.latitude_begin,
            TripField::LongitudeBegin => &mut self.longitude_begin,
            TripField::LatitudeEind => &mut self.latitude_eind,
            TripField::LongitudeEind => &mut self.longitude_eind,
        }
    }

    /// Case-insensitive substring match against any field.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        TripField::ALL
            .iter()
            .any(|&field| self.get(field).to_lowercase().contains(needle))
    }
}

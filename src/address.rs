// 📮 Address formatting - locale-aware canonical addresses
//
// Countries with a dedicated entry have a layout template, a set of required
// fields and (for numeric postal systems) a postal code pattern. Any other
// ISO 3166-1 country gets a generic layout. Templates use the
// libaddressinput field codes:
//
//   %A street lines   %C locality   %S administrative area   %Z postal code
//   %n line break     anything else is literal text
//
// Every component is trimmed, whitespace-collapsed and upper-cased before it is
// laid out, so two spellings of the same address produce the same lines.

use crate::error::NormalizationError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// ============================================================================
// FORMAT TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    StreetAddress,
    Locality,
    AdministrativeArea,
    PostCode,
}

impl AddressField {
    pub fn name(&self) -> &'static str {
        match self {
            AddressField::StreetAddress => "street_address",
            AddressField::Locality => "locality",
            AddressField::AdministrativeArea => "administrative_area",
            AddressField::PostCode => "post_code",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AddressFormat {
    pub country_code: &'static str,
    pub country_name: &'static str,
    pub template: &'static str,
    pub required: &'static [AddressField],
    /// Anchored pattern the (already truncated) postal code must match
    pub postal_pattern: Option<&'static str>,
}

use AddressField::{AdministrativeArea as S, Locality as C, PostCode as Z, StreetAddress as A};

static FORMATS: &[AddressFormat] = &[
    AddressFormat {
        country_code: "US",
        country_name: "UNITED STATES",
        template: "%A%n%C, %S %Z",
        required: &[A, C, S, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "CA",
        country_name: "CANADA",
        template: "%A%n%C %S %Z",
        required: &[A, C, S, Z],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "MX",
        country_name: "MEXICO",
        template: "%A%n%Z %C, %S",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "GB",
        country_name: "UNITED KINGDOM",
        template: "%A%n%C%n%Z",
        required: &[A, C, Z],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "IE",
        country_name: "IRELAND",
        template: "%A%n%C%n%S%n%Z",
        required: &[A, C],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "DE",
        country_name: "GERMANY",
        template: "%A%n%Z %C",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "FR",
        country_name: "FRANCE",
        template: "%A%n%Z %C",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "IT",
        country_name: "ITALY",
        template: "%A%n%Z %C %S",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "ES",
        country_name: "SPAIN",
        template: "%A%n%Z %C %S",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "NL",
        country_name: "NETHERLANDS",
        template: "%A%n%Z %C",
        required: &[A, C, Z],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "CH",
        country_name: "SWITZERLAND",
        template: "%A%n%Z %C",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{4}$"),
    },
    AddressFormat {
        country_code: "AU",
        country_name: "AUSTRALIA",
        template: "%A%n%C %S %Z",
        required: &[A, C, S, Z],
        postal_pattern: Some(r"^\d{4}$"),
    },
    AddressFormat {
        country_code: "NZ",
        country_name: "NEW ZEALAND",
        template: "%A%n%C %Z",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{4}$"),
    },
    AddressFormat {
        country_code: "IN",
        country_name: "INDIA",
        template: "%A%n%C %Z%n%S",
        required: &[A, C, S, Z],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "PH",
        country_name: "PHILIPPINES",
        template: "%A%n%C %Z%n%S",
        required: &[A, C],
        postal_pattern: Some(r"^\d{4}$"),
    },
    AddressFormat {
        country_code: "JP",
        country_name: "JAPAN",
        template: "%Z%n%S %C%n%A",
        required: &[A, C, S, Z],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "KR",
        country_name: "SOUTH KOREA",
        template: "%S %C%n%A%n%Z",
        required: &[A, C, Z],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "IL",
        country_name: "ISRAEL",
        template: "%A%n%C %Z",
        required: &[A, C],
        postal_pattern: None,
    },
    AddressFormat {
        country_code: "SA",
        country_name: "SAUDI ARABIA",
        template: "%A%n%C %Z",
        required: &[A, C],
        postal_pattern: Some(r"^\d{5}$"),
    },
    AddressFormat {
        country_code: "AE",
        country_name: "UNITED ARAB EMIRATES",
        template: "%A%n%S",
        required: &[A, S],
        postal_pattern: None,
    },
];

static POSTAL_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    FORMATS
        .iter()
        .filter_map(|f| {
            f.postal_pattern
                .map(|p| (f.country_code, Regex::new(p).expect("static postal pattern")))
        })
        .collect()
});

/// Layout for ISO countries without a dedicated entry in `FORMATS`
const GENERIC_TEMPLATE: &str = "%A%n%C %S %Z";
const GENERIC_REQUIRED: &[AddressField] = &[A, C];

static GENERIC_FORMATS: LazyLock<HashMap<&'static str, AddressFormat>> = LazyLock::new(|| {
    COUNTRY_NAMES
        .iter()
        .map(|&(country_code, country_name)| {
            let format = AddressFormat {
                country_code,
                country_name,
                template: GENERIC_TEMPLATE,
                required: GENERIC_REQUIRED,
                postal_pattern: None,
            };
            (country_code, format)
        })
        .collect()
});

/// Look up the address format for an ISO 3166-1 alpha-2 code. Codes without
/// a dedicated layout get the generic one; non-ISO codes get `None`.
pub fn format_for(country_code: &str) -> Option<&'static AddressFormat> {
    FORMATS
        .iter()
        .find(|f| f.country_code == country_code)
        .or_else(|| GENERIC_FORMATS.get(country_code))
}

// ============================================================================
// ADDRESS
// ============================================================================

/// A validated, cleaned postal address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub street_address: Vec<String>,
    pub locality: String,
    pub administrative_area: String,
    pub post_code: String,
    pub country: String,
    format: &'static AddressFormat,
}

impl Address {
    /// Clean every component and validate it against the country's format.
    pub fn new_valid(
        street_address: &[String],
        locality: &str,
        administrative_area: &str,
        post_code: &str,
        country: &str,
    ) -> Result<Self, NormalizationError> {
        let country = clean_component(country);
        if country.is_empty() {
            return Err(NormalizationError::MissingCountry);
        }
        let format = format_for(&country)
            .ok_or_else(|| NormalizationError::UnsupportedCountry(country.clone()))?;

        let address = Address {
            street_address: street_address
                .iter()
                .map(|line| clean_component(line))
                .filter(|line| !line.is_empty())
                .collect(),
            locality: clean_component(locality),
            administrative_area: clean_component(administrative_area),
            post_code: clean_component(post_code),
            country,
            format,
        };

        address.validate()?;
        Ok(address)
    }

    fn validate(&self) -> Result<(), NormalizationError> {
        for field in self.format.required {
            if self.is_empty(*field) {
                return Err(NormalizationError::MissingField {
                    country: self.country.clone(),
                    field: field.name(),
                });
            }
        }

        if !self.post_code.is_empty() {
            if let Some(pattern) = POSTAL_PATTERNS.get(self.format.country_code) {
                if !pattern.is_match(&self.post_code) {
                    return Err(NormalizationError::InvalidPostalCode {
                        country: self.country.clone(),
                        postal_code: self.post_code.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn is_empty(&self, field: AddressField) -> bool {
        match field {
            AddressField::StreetAddress => self.street_address.is_empty(),
            AddressField::Locality => self.locality.is_empty(),
            AddressField::AdministrativeArea => self.administrative_area.is_empty(),
            AddressField::PostCode => self.post_code.is_empty(),
        }
    }

    /// Lay the address out per its country template. The country name is the last line.
    pub fn format_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for template_line in self.format.template.split("%n") {
            // Street lines expand into one output line each
            if template_line == "%A" {
                lines.extend(self.street_address.iter().cloned());
                continue;
            }

            let mut rendered = String::new();
            let mut chars = template_line.chars().peekable();
            while let Some(c) = chars.next() {
                if c != '%' {
                    rendered.push(c);
                    continue;
                }
                match chars.next() {
                    Some('A') => rendered.push_str(&self.street_address.join(" ")),
                    Some('C') => rendered.push_str(&self.locality),
                    Some('S') => rendered.push_str(&self.administrative_area),
                    Some('Z') => rendered.push_str(&self.post_code),
                    Some(other) => {
                        rendered.push('%');
                        rendered.push(other);
                    }
                    None => rendered.push('%'),
                }
            }

            let line = tidy_line(&rendered);
            if !line.is_empty() {
                lines.push(line);
            }
        }

        lines.push(self.format.country_name.to_string());
        lines
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Trim, collapse whitespace runs, upper-case.
fn clean_component(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Collapse whitespace and drop separators orphaned by empty fields
/// ("SPRINGFIELD, " → "SPRINGFIELD", ", IL 62701" → "IL 62701").
fn tidy_line(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .replace(" ,", ",")
}

// ============================================================================
// ISO 3166-1
// ============================================================================

/// Every assigned ISO 3166-1 alpha-2 code with its English short name
static COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AD", "ANDORRA"),
    ("AE", "UNITED ARAB EMIRATES"),
    ("AF", "AFGHANISTAN"),
    ("AG", "ANTIGUA AND BARBUDA"),
    ("AI", "ANGUILLA"),
    ("AL", "ALBANIA"),
    ("AM", "ARMENIA"),
    ("AO", "ANGOLA"),
    ("AQ", "ANTARCTICA"),
    ("AR", "ARGENTINA"),
    ("AS", "AMERICAN SAMOA"),
    ("AT", "AUSTRIA"),
    ("AU", "AUSTRALIA"),
    ("AW", "ARUBA"),
    ("AX", "ALAND ISLANDS"),
    ("AZ", "AZERBAIJAN"),
    ("BA", "BOSNIA AND HERZEGOVINA"),
    ("BB", "BARBADOS"),
    ("BD", "BANGLADESH"),
    ("BE", "BELGIUM"),
    ("BF", "BURKINA FASO"),
    ("BG", "BULGARIA"),
    ("BH", "BAHRAIN"),
    ("BI", "BURUNDI"),
    ("BJ", "BENIN"),
    ("BL", "SAINT BARTHELEMY"),
    ("BM", "BERMUDA"),
    ("BN", "BRUNEI"),
    ("BO", "BOLIVIA"),
    ("BQ", "CARIBBEAN NETHERLANDS"),
    ("BR", "BRAZIL"),
    ("BS", "BAHAMAS"),
    ("BT", "BHUTAN"),
    ("BV", "BOUVET ISLAND"),
    ("BW", "BOTSWANA"),
    ("BY", "BELARUS"),
    ("BZ", "BELIZE"),
    ("CA", "CANADA"),
    ("CC", "COCOS (KEELING) ISLANDS"),
    ("CD", "CONGO - KINSHASA"),
    ("CF", "CENTRAL AFRICAN REPUBLIC"),
    ("CG", "CONGO - BRAZZAVILLE"),
    ("CH", "SWITZERLAND"),
    ("CI", "COTE D'IVOIRE"),
    ("CK", "COOK ISLANDS"),
    ("CL", "CHILE"),
    ("CM", "CAMEROON"),
    ("CN", "CHINA"),
    ("CO", "COLOMBIA"),
    ("CR", "COSTA RICA"),
    ("CU", "CUBA"),
    ("CV", "CAPE VERDE"),
    ("CW", "CURACAO"),
    ("CX", "CHRISTMAS ISLAND"),
    ("CY", "CYPRUS"),
    ("CZ", "CZECHIA"),
    ("DE", "GERMANY"),
    ("DJ", "DJIBOUTI"),
    ("DK", "DENMARK"),
    ("DM", "DOMINICA"),
    ("DO", "DOMINICAN REPUBLIC"),
    ("DZ", "ALGERIA"),
    ("EC", "ECUADOR"),
    ("EE", "ESTONIA"),
    ("EG", "EGYPT"),
    ("EH", "WESTERN SAHARA"),
    ("ER", "ERITREA"),
    ("ES", "SPAIN"),
    ("ET", "ETHIOPIA"),
    ("FI", "FINLAND"),
    ("FJ", "FIJI"),
    ("FK", "FALKLAND ISLANDS"),
    ("FM", "MICRONESIA"),
    ("FO", "FAROE ISLANDS"),
    ("FR", "FRANCE"),
    ("GA", "GABON"),
    ("GB", "UNITED KINGDOM"),
    ("GD", "GRENADA"),
    ("GE", "GEORGIA"),
    ("GF", "FRENCH GUIANA"),
    ("GG", "GUERNSEY"),
    ("GH", "GHANA"),
    ("GI", "GIBRALTAR"),
    ("GL", "GREENLAND"),
    ("GM", "GAMBIA"),
    ("GN", "GUINEA"),
    ("GP", "GUADELOUPE"),
    ("GQ", "EQUATORIAL GUINEA"),
    ("GR", "GREECE"),
    ("GS", "SOUTH GEORGIA AND SOUTH SANDWICH ISLANDS"),
    ("GT", "GUATEMALA"),
    ("GU", "GUAM"),
    ("GW", "GUINEA-BISSAU"),
    ("GY", "GUYANA"),
    ("HK", "HONG KONG"),
    ("HM", "HEARD AND MCDONALD ISLANDS"),
    ("HN", "HONDURAS"),
    ("HR", "CROATIA"),
    ("HT", "HAITI"),
    ("HU", "HUNGARY"),
    ("ID", "INDONESIA"),
    ("IE", "IRELAND"),
    ("IL", "ISRAEL"),
    ("IM", "ISLE OF MAN"),
    ("IN", "INDIA"),
    ("IO", "BRITISH INDIAN OCEAN TERRITORY"),
    ("IQ", "IRAQ"),
    ("IR", "IRAN"),
    ("IS", "ICELAND"),
    ("IT", "ITALY"),
    ("JE", "JERSEY"),
    ("JM", "JAMAICA"),
    ("JO", "JORDAN"),
    ("JP", "JAPAN"),
    ("KE", "KENYA"),
    ("KG", "KYRGYZSTAN"),
    ("KH", "CAMBODIA"),
    ("KI", "KIRIBATI"),
    ("KM", "COMOROS"),
    ("KN", "SAINT KITTS AND NEVIS"),
    ("KP", "NORTH KOREA"),
    ("KR", "SOUTH KOREA"),
    ("KW", "KUWAIT"),
    ("KY", "CAYMAN ISLANDS"),
    ("KZ", "KAZAKHSTAN"),
    ("LA", "LAOS"),
    ("LB", "LEBANON"),
    ("LC", "SAINT LUCIA"),
    ("LI", "LIECHTENSTEIN"),
    ("LK", "SRI LANKA"),
    ("LR", "LIBERIA"),
    ("LS", "LESOTHO"),
    ("LT", "LITHUANIA"),
    ("LU", "LUXEMBOURG"),
    ("LV", "LATVIA"),
    ("LY", "LIBYA"),
    ("MA", "MOROCCO"),
    ("MC", "MONACO"),
    ("MD", "MOLDOVA"),
    ("ME", "MONTENEGRO"),
    ("MF", "SAINT MARTIN"),
    ("MG", "MADAGASCAR"),
    ("MH", "MARSHALL ISLANDS"),
    ("MK", "NORTH MACEDONIA"),
    ("ML", "MALI"),
    ("MM", "MYANMAR (BURMA)"),
    ("MN", "MONGOLIA"),
    ("MO", "MACAO"),
    ("MP", "NORTHERN MARIANA ISLANDS"),
    ("MQ", "MARTINIQUE"),
    ("MR", "MAURITANIA"),
    ("MS", "MONTSERRAT"),
    ("MT", "MALTA"),
    ("MU", "MAURITIUS"),
    ("MV", "MALDIVES"),
    ("MW", "MALAWI"),
    ("MX", "MEXICO"),
    ("MY", "MALAYSIA"),
    ("MZ", "MOZAMBIQUE"),
    ("NA", "NAMIBIA"),
    ("NC", "NEW CALEDONIA"),
    ("NE", "NIGER"),
    ("NF", "NORFOLK ISLAND"),
    ("NG", "NIGERIA"),
    ("NI", "NICARAGUA"),
    ("NL", "NETHERLANDS"),
    ("NO", "NORWAY"),
    ("NP", "NEPAL"),
    ("NR", "NAURU"),
    ("NU", "NIUE"),
    ("NZ", "NEW ZEALAND"),
    ("OM", "OMAN"),
    ("PA", "PANAMA"),
    ("PE", "PERU"),
    ("PF", "FRENCH POLYNESIA"),
    ("PG", "PAPUA NEW GUINEA"),
    ("PH", "PHILIPPINES"),
    ("PK", "PAKISTAN"),
    ("PL", "POLAND"),
    ("PM", "SAINT PIERRE AND MIQUELON"),
    ("PN", "PITCAIRN ISLANDS"),
    ("PR", "PUERTO RICO"),
    ("PS", "PALESTINIAN TERRITORIES"),
    ("PT", "PORTUGAL"),
    ("PW", "PALAU"),
    ("PY", "PARAGUAY"),
    ("QA", "QATAR"),
    ("RE", "REUNION"),
    ("RO", "ROMANIA"),
    ("RS", "SERBIA"),
    ("RU", "RUSSIA"),
    ("RW", "RWANDA"),
    ("SA", "SAUDI ARABIA"),
    ("SB", "SOLOMON ISLANDS"),
    ("SC", "SEYCHELLES"),
    ("SD", "SUDAN"),
    ("SE", "SWEDEN"),
    ("SG", "SINGAPORE"),
    ("SH", "SAINT HELENA"),
    ("SI", "SLOVENIA"),
    ("SJ", "SVALBARD AND JAN MAYEN"),
    ("SK", "SLOVAKIA"),
    ("SL", "SIERRA LEONE"),
    ("SM", "SAN MARINO"),
    ("SN", "SENEGAL"),
    ("SO", "SOMALIA"),
    ("SR", "SURINAME"),
    ("SS", "SOUTH SUDAN"),
    ("ST", "SAO TOME AND PRINCIPE"),
    ("SV", "EL SALVADOR"),
    ("SX", "SINT MAARTEN"),
    ("SY", "SYRIA"),
    ("SZ", "ESWATINI"),
    ("TC", "TURKS AND CAICOS ISLANDS"),
    ("TD", "CHAD"),
    ("TF", "FRENCH SOUTHERN TERRITORIES"),
    ("TG", "TOGO"),
    ("TH", "THAILAND"),
    ("TJ", "TAJIKISTAN"),
    ("TK", "TOKELAU"),
    ("TL", "TIMOR-LESTE"),
    ("TM", "TURKMENISTAN"),
    ("TN", "TUNISIA"),
    ("TO", "TONGA"),
    ("TR", "TURKEY"),
    ("TT", "TRINIDAD AND TOBAGO"),
    ("TV", "TUVALU"),
    ("TW", "TAIWAN"),
    ("TZ", "TANZANIA"),
    ("UA", "UKRAINE"),
    ("UG", "UGANDA"),
    ("UM", "U.S. OUTLYING ISLANDS"),
    ("US", "UNITED STATES"),
    ("UY", "URUGUAY"),
    ("UZ", "UZBEKISTAN"),
    ("VA", "VATICAN CITY"),
    ("VC", "SAINT VINCENT AND GRENADINES"),
    ("VE", "VENEZUELA"),
    ("VG", "BRITISH VIRGIN ISLANDS"),
    ("VI", "U.S. VIRGIN ISLANDS"),
    ("VN", "VIETNAM"),
    ("VU", "VANUATU"),
    ("WF", "WALLIS AND FUTUNA"),
    ("WS", "SAMOA"),
    ("YE", "YEMEN"),
    ("YT", "MAYOTTE"),
    ("ZA", "SOUTH AFRICA"),
    ("ZM", "ZAMBIA"),
    ("ZW", "ZIMBABWE"),
];

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_us_address_format() {
        let addr = Address::new_valid(
            &lines(&["123 Main St", "Suite 100"]),
            "Springfield",
            "IL",
            "62701",
            "US",
        )
        .unwrap();

        assert_eq!(
            addr.format_lines(),
            vec![
                "123 MAIN ST".to_string(),
                "SUITE 100".to_string(),
                "SPRINGFIELD, IL 62701".to_string(),
                "UNITED STATES".to_string(),
            ]
        );
    }

    #[test]
    fn test_german_address_puts_postcode_first() {
        let addr = Address::new_valid(&lines(&["Hauptstr 5"]), "Berlin", "", "10115", "DE").unwrap();

        assert_eq!(
            addr.format_lines(),
            vec!["HAUPTSTR 5".to_string(), "10115 BERLIN".to_string(), "GERMANY".to_string()]
        );
    }

    #[test]
    fn test_optional_fields_leave_no_dangling_separators() {
        // Ireland does not require county or eircode
        let addr = Address::new_valid(&lines(&["1 Quay St"]), "Galway", "", "", "IE").unwrap();

        assert_eq!(
            addr.format_lines(),
            vec!["1 QUAY ST".to_string(), "GALWAY".to_string(), "IRELAND".to_string()]
        );
    }

    #[test]
    fn test_missing_required_field() {
        let result = Address::new_valid(&lines(&["123 Main St"]), "Springfield", "", "62701", "US");

        assert_eq!(
            result,
            Err(NormalizationError::MissingField {
                country: "US".to_string(),
                field: "administrative_area",
            })
        );
    }

    #[test]
    fn test_blank_street_lines_count_as_missing() {
        let result = Address::new_valid(&lines(&["", "   "]), "Springfield", "IL", "62701", "US");

        assert!(matches!(
            result,
            Err(NormalizationError::MissingField { field: "street_address", .. })
        ));
    }

    #[test]
    fn test_invalid_postal_code() {
        let result = Address::new_valid(&lines(&["123 Main St"]), "Springfield", "IL", "6270", "US");

        assert_eq!(
            result,
            Err(NormalizationError::InvalidPostalCode {
                country: "US".to_string(),
                postal_code: "6270".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_and_unsupported_country() {
        assert_eq!(
            Address::new_valid(&lines(&["1 Road"]), "Town", "", "", " "),
            Err(NormalizationError::MissingCountry)
        );
        assert_eq!(
            Address::new_valid(&lines(&["1 Road"]), "Town", "", "", "xx"),
            Err(NormalizationError::UnsupportedCountry("XX".to_string()))
        );
    }

    #[test]
    fn test_country_without_dedicated_layout_uses_generic_format() {
        let addr = Address::new_valid(
            &lines(&["Av Paulista 1000"]),
            "Sao Paulo",
            "SP",
            "01310",
            "br",
        )
        .unwrap();

        assert_eq!(addr.country, "BR");
        assert_eq!(
            addr.format_lines(),
            vec!["AV PAULISTA 1000".to_string(), "SAO PAULO SP 01310".to_string(), "BRAZIL".to_string()]
        );

        // Street and locality are still required
        assert_eq!(
            Address::new_valid(&lines(&["Av Paulista 1000"]), "", "SP", "01310", "BR"),
            Err(NormalizationError::MissingField {
                country: "BR".to_string(),
                field: "locality",
            })
        );
    }

    #[test]
    fn test_every_format_has_a_country_name() {
        for format in FORMATS {
            assert_eq!(format.country_code.len(), 2);
            assert!(!format.country_name.is_empty());
            assert!(format.required.contains(&AddressField::StreetAddress));
            // Dedicated layouts only cover real ISO codes
            assert!(COUNTRY_NAMES.iter().any(|(code, _)| *code == format.country_code));
        }
        assert_eq!(COUNTRY_NAMES.len(), 249);
        assert!(format_for("ZZ").is_none());
        assert_eq!(format_for("US").unwrap().template, "%A%n%C, %S %Z");
        // Forces every static pattern to compile
        assert!(POSTAL_PATTERNS.len() >= 10);
    }
}

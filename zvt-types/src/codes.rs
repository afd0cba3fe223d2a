//! Status and error code tables

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Language of the intermediate status texts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    English,
    German,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "de" | "german" | "deutsch" => Ok(Self::German),
            other => Err(Error::Parse(format!("Unknown locale: {}", other))),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => write!(f, "en"),
            Self::German => write!(f, "de"),
        }
    }
}

/// Intermediate statuses that ask the cardholder to act on the terminal
const TERMINAL_ATTENTION: [u8; 38] = [
    0x01, 0x02, 0x03, 0x07, 0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E, 0x10, 0x12, 0x13, 0x14, 0x15,
    0x17, 0x18, 0x19, 0x1B, 0x1C, 0x1D, 0x43, 0x47, 0x48, 0x49, 0x4C, 0x4D, 0x4E, 0x50, 0x52,
    0x53, 0x55, 0x57, 0x58, 0x59, 0x5B, 0x5C, 0x5D,
];

/// Check if an intermediate status needs the cardholder at the terminal
pub fn requires_terminal_attention(status: u8) -> bool {
    TERMINAL_ATTENTION.contains(&status)
}

/// Text of an intermediate status (`04 FF`)
///
/// # Examples
///
/// ```
/// use zvt_types::{intermediate_status, Locale};
///
/// assert_eq!(intermediate_status(0x0A, Locale::English), Some("Insert card"));
/// assert_eq!(intermediate_status(0x0A, Locale::German), Some("Karte einstecken"));
/// ```
pub fn intermediate_status(status: u8, locale: Locale) -> Option<&'static str> {
    match locale {
        Locale::English => intermediate_status_en(status),
        Locale::German => intermediate_status_de(status),
    }
}

fn intermediate_status_en(status: u8) -> Option<&'static str> {
    let text = match status {
        0x00 => "PT is waiting for amount-confirmation",
        0x01 | 0x02 => "Please watch PIN-Pad",
        0x03 => "Not accepted",
        0x04 => "PT is waiting for response from FEP",
        0x05 => "PT is sending auto-reversal",
        0x06 => "PT is sending post-bookings",
        0x07 => "Card not admitted",
        0x08 => "Card unknown / undefined",
        0x09 => "Expired card",
        0x0A => "Insert card",
        0x0B => "Please remove card!",
        0x0C => "Card not readable",
        0x0D => "Processing error",
        0x0E => "Please wait...",
        0x0F => "PT is commencing an automatic end-of-day batch",
        0x10 => "Invalid card",
        0x11 => "Balance display",
        0x12 => "System malfunction",
        0x13 => "Payment not possible",
        0x14 => "Credit not sufficient",
        0x15 => "Incorrect PIN",
        0x16 => "Limit not sufficient",
        0x17 => "Please wait...",
        0x18 => "PIN try limit exceeded",
        0x19 => "Card-data incorrect",
        0x1A => "Service-mode",
        0x1B => "Approved. Please fill-up",
        0x1C => "Approved. Please take goods",
        0x1D => "Declined",
        0x26 => "PT is waiting for input of the mobile-number",
        0x27 => "PT is waiting for repeat of mobile number",
        0x41 | 0x42 => "Please watch PIN-Pad. Please remove card!",
        0x43 => "Not accepted. Please remove card!",
        0x44 => "PT is waiting for response from FEP. Please remove card!",
        0x45 => "PT is sending auto-reversal. Please remove card!",
        0x46 => "PT is sending post-booking. Please remove card!",
        0x47 => "Card not admitted. Please remove card!",
        0x48 => "Card unknown / undefined. Please remove card!",
        0x49 => "Expired card. Please remove card!",
        0x4A => "",
        0x4B => "Please remove card!",
        0x4C => "Card not readable. Please remove card!",
        0x4D => "Processing error. Please remove card!",
        0x4E => "Please wait... Please remove card!",
        0x4F => "PT is commencing an automatic end-of-day batch. Please remove card!",
        0x50 => "Invalid card. Please remove card!",
        0x51 => "Balance display. Please remove card!",
        0x52 => "System malfunction. Please remove card!",
        0x53 => "Payment not possible. Please remove card!",
        0x54 => "Credit not sufficient. Please remove card!",
        0x55 => "Incorrect PIN. Please remove card!",
        0x56 => "Limit not sufficient. Please remove card!",
        0x57 => "Please wait... Please remove card!",
        0x58 => "PIN try limit exceeded. Please remove card!",
        0x59 => "Card-data incorrect. Please remove card!",
        0x5A => "Service-mode. Please remove card!",
        0x5B => "Approved. Please fill-up. Please remove card!",
        0x5C => "Approved. Please take goods. Please remove card!",
        0x5D => "Declined. Please remove card!",
        0x66 => "PT is waiting for input of the mobile-number. Please remove card!",
        0x67 => "PT is waiting for repeat of the mobile-number. Please remove card!",
        0xC7 => "PT is waiting for input of the mileage",
        0xC8 => "PT is waiting for cashier",
        0xC9 => "PT is commencing an automatic diagnosis",
        0xCA => "PT is commencing an automatic initialisation",
        0xCB => "Merchant-journal full",
        0xCC => "Debit advice not possible, PIN required",
        0xD2 => "Connecting dial-up",
        0xD3 => "Dial-up connection made",
        0xE0 => "PT is waiting for application-selection",
        0xE1 => "PT is waiting for language-selection",
        0xF1 => "Offline",
        0xF2 => "Online",
        0xF3 => "Offline transaction",
        0xFF => "Custom or unknown status",
        _ => return None,
    };
    Some(text)
}

fn intermediate_status_de(status: u8) -> Option<&'static str> {
    let text = match status {
        0x00 => "BZT wartet auf Betragbestätigung",
        0x01 | 0x02 => "Bitte Anzeigen auf dem PIN-Pad beachten",
        0x03 => "Vorgang nicht möglich",
        0x04 => "BZT wartet auf Antwort vom FEP",
        0x05 => "BZT sendet Autostorno",
        0x06 => "BZT sendet Nachbuchungen",
        0x07 => "Karte nicht zugelassen",
        0x08 => "Karte unbekannt / undefiniert",
        0x09 => "Karte verfallen",
        0x0A => "Karte einstecken",
        0x0B => "Bitte Karte entnehmen!",
        0x0C => "Karte nicht lesbar",
        0x0D => "Vorgang abgebrochen",
        0x0E => "Vorgang wird bearbeitet bitte warten...",
        0x0F => "BZT leitet einen automatischen Kassenabschluss ein",
        0x10 => "Karte ungültig",
        0x11 => "Guthabenanzeige",
        0x12 => "Systemfehler",
        0x13 => "Zahlung nicht möglich",
        0x14 => "Guthaben nicht ausreichend",
        0x15 => "Geheimzahl falsch",
        0x16 => "Limit nicht ausreichend",
        0x17 => "Bitte warten...",
        0x18 => "Geheimzahl zu oft falsch",
        0x19 => "Kartendaten falsch",
        0x1A => "Servicemodus",
        0x1B => "Autorisierung erfolgt. Bitte tanken",
        0x1C => "Zahlung erfolgt. Bitte Ware entnehmen",
        0x1D => "Autorisierung nicht möglich",
        0x26 => "BZT wartet auf Eingabe der Mobilfunknummer",
        0x27 => "BZT wartet auf Wiederholung der Mobilfunknummer",
        0x41 | 0x42 => "Bitte Anzeigen auf dem PIN-Pad beachten. Bitte Karte entnehmen!",
        0x43 => "Vorgang nicht möglich. Bitte Karte entnehmen!",
        0x44 => "BZT wartet auf Antwort vom FEP. Bitte Karte entnehmen!",
        0x45 => "BZT sendet Autostorno. Bitte Karte entnehmen!",
        0x46 => "BZT sendet Nachbuchungen. Bitte Karte entnehmen!",
        0x47 => "Karte nicht zugelassen. Bitte Karte entnehmen!",
        0x48 => "Karte unbekannt / undefiniert. Bitte Karte entnehmen!",
        0x49 => "Karte verfallen. Bitte Karte entnehmen!",
        0x4A => "",
        0x4B => "Bitte Karte entnehmen!",
        0x4C => "Karte nicht lesbar. Bitte Karte entnehmen!",
        0x4D => "Vorgang abgebrochen. Bitte Karte entnehmen!",
        0x4E => "Vorgang wird bearbeitet bitte warten... Bitte Karte entnehmen!",
        0x4F => "BZT leitet einen automatischen Kassenabschluss ein. Bitte Karte entnehmen!",
        0x50 => "Karte ungültig. Bitte Karte entnehmen!",
        0x51 => "Guthabenanzeige. Bitte Karte entnehmen!",
        0x52 => "Systemfehler. Bitte Karte entnehmen!",
        0x53 => "Zahlung nicht möglich. Bitte Karte entnehmen!",
        0x54 => "Guthaben nicht ausreichend. Bitte Karte entnehmen!",
        0x55 => "Geheimzahl falsch. Bitte Karte entnehmen!",
        0x56 => "Limit nicht ausreichend. Bitte Karte entnehmen!",
        0x57 => "Bitte warten... Bitte Karte entnehmen!",
        0x58 => "Geheimzahl zu oft falsch. Bitte Karte entnehmen!",
        0x59 => "Kartendaten falsch. Bitte Karte entnehmen!",
        0x5A => "Servicemodus. Bitte Karte entnehmen!",
        0x5B => "Autorisierung erfolgt. Bitte tanken. Bitte Karte entnehmen!",
        0x5C => "Zahlung erfolgt. Bitte Ware entnehmen. Bitte Karte entnehmen!",
        0x5D => "Autorisierung nicht möglich. Bitte Karte entnehmen!",
        0x66 => "BZT wartet auf Eingabe der Mobilfunknummer. Bitte Karte entnehmen!",
        0x67 => "BZT wartet auf Wiederholung der Mobilfunknummer. Bitte Karte entnehmen!",
        0xC7 => "BZT wartet auf Eingabe des Kilometerstands",
        0xC8 => "BZT wartet auf Kassierer",
        0xC9 => "BZT leitet eine automatische Diagnose ein",
        0xCA => "BZT leitet eine automatische Initialisierung ein",
        0xCB => "Händlerjournal voll",
        0xCC => "Lastschrift nicht möglich, PIN notwendig",
        0xD2 => "DFÜ-Verbindung wird hergestellt",
        0xD3 => "DFÜ-Verbindung besteht",
        0xE0 => "BZT wartet auf Anwendungsauswahl",
        0xE1 => "BZT wartet auf Sprachauswahl",
        0xF1 => "Offline",
        0xF2 => "Online",
        0xF3 => "Offline-Transaktion",
        0xFF => "Benutzerdefinierter oder unbekannter Status",
        _ => return None,
    };
    Some(text)
}

/// Text of a result code (`84 xx` error byte, completion result)
///
/// Codes 0x01-0x63 come from the network operator and have no fixed text.
///
/// # Examples
///
/// ```
/// use zvt_types::error_message;
///
/// assert_eq!(error_message(0x6C), Some("Abort via time-out or abort-key"));
/// assert_eq!(error_message(0x20), None);
/// ```
pub fn error_message(code: u8) -> Option<&'static str> {
    let text = match code {
        0x00 => "No error",
        0x64 => "Card not readable (LRC-/parity-error)",
        0x65 => "Card-data not present (neither track-data nor chip found)",
        0x66 => "Processing-error (also for problems with card-reader mechanism)",
        0x67 => "Function not permitted for ec- and Maestro-cards",
        0x68 => "Function not permitted for credit- and tank-cards",
        0x6A => "Turnover-file full",
        0x6B => "Function deactivated (PT not registered)",
        0x6C => "Abort via time-out or abort-key",
        0x6E => "Card in blocked-list (response to command 06 E4)",
        0x6F => "Wrong currency",
        0x71 => "Credit not sufficient (chip-card)",
        0x72 => "Chip error",
        0x73 => "Card-data incorrect (e.g. country-key check, checksum-error)",
        0x77 => "End-of-day batch not possible",
        0x78 => "Card expired",
        0x79 => "Card not yet valid",
        0x7A => "Card unknown",
        0x7D => "Communication error (communication module does not answer or is not present)",
        0x83 => "Function not possible",
        0x85 => "Key missing",
        0x89 => "PIN-pad defective",
        0x9A => "Transfer protocol error",
        0x9B => "Error from dial-up/communication fault",
        0x9C => "Please wait",
        0xA0 => "Receiver not ready",
        0xA1 => "Remote station does not respond",
        0xA3 => "No connection",
        0xA4 => "Submission of Geldkarte not possible",
        0xB1 => "Memory full",
        0xB2 => "Merchant-journal full",
        0xB4 => "Already reversed",
        0xB5 => "Reversal not possible",
        0xB7 => "Pre-authorisation incorrect (amount too high) or amount wrong",
        0xB8 => "Error pre-authorisation",
        0xBF => "Voltage supply too low (external power supply)",
        0xC0 => "Card locking mechanism defective",
        0xC1 => "Merchant-card locked",
        0xC2 => "Diagnosis required",
        0xC3 => "Maximum amount exceeded",
        0xC4 => "Card-profile invalid. New card-profiles must be loaded.",
        0xC5 => "Payment method not supported",
        0xC6 => "Currency not applicable",
        0xC8 => "Amount too small",
        0xC9 => "Max. transaction-amount too small",
        0xCB => "Function only allowed in EURO",
        0xCC => "Printer not ready",
        0xD2 => "Function not permitted for service-cards/bank-customer-cards",
        0xDC => "Card inserted",
        0xDD => "Error during card-eject (for motor-insertion reader)",
        0xDE => "Error during card-insertion (for motor-insertion reader)",
        0xE0 => "Remote-maintenance activated",
        0xE2 => "Card-reader does not answer / card-reader defective",
        0xE3 => "Shutter closed",
        0xE7 => "Min. one goods-group not found",
        0xE8 => "No goods-groups-table loaded",
        0xE9 => "Restriction-code not permitted",
        0xEA => "Card-code not permitted (e.g. card not activated via Diagnosis)",
        0xEB => "Function not executable (PIN-algorithm unknown)",
        0xEC => "PIN-processing not possible",
        0xED => "PIN-pad defective",
        0xF0 => "Open end-of-day batch present",
        0xF1 => "Ec-cash/Maestro offline error",
        0xF5 => "OPT-error",
        0xF6 => "OPT-data not available (= OPT personalisation required)",
        0xFA => "Error transmitting offline-transactions (clearing error)",
        0xFB => "Turnover data-set defective",
        0xFC => "Necessary device not present or defective",
        0xFD => "Baudrate not supported",
        0xFE => "Register unknown",
        0xFF => "System error",
        _ => return None,
    };
    Some(text)
}

/// Text of a terminal status byte (status enquiry completion)
pub fn terminal_status(status: u8) -> Option<&'static str> {
    let text = match status {
        0x00 => "PT ready",
        0x51 => "Initialisation required",
        0x62 => "Date/time incorrect",
        0x9C => "Please wait (e.g. software-update still running)",
        0xB1 => "Memory full",
        0xB2 => "Merchant-journal full",
        0xBF => "Voltage supply too low (external power supply)",
        0xC0 => "Card locking mechanism defect",
        0xC1 => "Merchant card locked",
        0xC2 => "Diagnosis required",
        0xC4 => "Card-profile invalid. New card-profiles must be loaded",
        0xCC => "Printer not ready",
        0xDC => "Card inserted",
        0xDF => "Out-of-order",
        0xE0 => "Remote-maintenance activated",
        0xE1 => "Card not completely removed",
        0xE2 => "Card-reader does not answer / card-reader defective",
        0xE3 => "Shutter closed",
        0xF6 => "OPT-data not available (= OPT-Personalisation required)",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_locale_parse() {
        assert_eq!("de".parse::<Locale>().unwrap(), Locale::German);
        assert_eq!("English".parse::<Locale>().unwrap(), Locale::English);
        assert!("fr".parse::<Locale>().is_err());
        assert_eq!(Locale::default(), Locale::English);
        assert_eq!(Locale::German.to_string(), "de");
    }

    #[test]
    fn test_intermediate_status_both_locales() {
        assert_eq!(intermediate_status(0x15, Locale::English), Some("Incorrect PIN"));
        assert_eq!(intermediate_status(0x15, Locale::German), Some("Geheimzahl falsch"));
        assert_eq!(intermediate_status(0x30, Locale::English), None);
    }

    #[test]
    fn test_locales_cover_same_codes() {
        for status in 0..=u8::MAX {
            assert_eq!(
                intermediate_status(status, Locale::English).is_some(),
                intermediate_status(status, Locale::German).is_some(),
                "status 0x{:02X}",
                status
            );
        }
    }

    #[test]
    fn test_terminal_attention() {
        assert!(requires_terminal_attention(0x0A));
        assert!(requires_terminal_attention(0x5D));
        assert!(!requires_terminal_attention(0x0B));
        assert!(!requires_terminal_attention(0xFF));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(0x00), Some("No error"));
        assert_eq!(error_message(0xFF), Some("System error"));
        assert_eq!(error_message(0x42), None);
    }

    #[test]
    fn test_terminal_status() {
        assert_eq!(terminal_status(0x00), Some("PT ready"));
        assert_eq!(terminal_status(0xDF), Some("Out-of-order"));
        assert_eq!(terminal_status(0x01), None);
    }
}

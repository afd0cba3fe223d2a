//! ZVT control codes
//!
//! Every APDU starts with a class byte and an instruction byte. Together they
//! select the packet kind.

use std::fmt;

/// Control code (class, instruction) of an APDU
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlCode {
    /// Class byte (CLASS)
    pub class: u8,

    /// Instruction byte (INSTR)
    pub instr: u8,
}

impl ControlCode {
    // Acknowledgements
    pub const PACKET_RECEIVED: Self = Self::new(0x80, 0x00);
    pub const POSITIVE_ACK: Self = Self::new(0x84, 0x00);
    pub const REPEAT_STATUS_INFO: Self = Self::new(0x84, 0x9C);

    // Terminal to ECR
    pub const STATUS_INFORMATION: Self = Self::new(0x04, 0x0F);
    pub const INTERMEDIATE_STATUS: Self = Self::new(0x04, 0xFF);
    pub const COMPLETION: Self = Self::new(0x06, 0x0F);
    pub const ABORT: Self = Self::new(0x06, 0x1E);
    pub const PRINT_LINE: Self = Self::new(0x06, 0xD1);
    pub const PRINT_TEXT_BLOCK: Self = Self::new(0x06, 0xD3);

    // ECR to terminal
    pub const REGISTRATION: Self = Self::new(0x06, 0x00);
    pub const AUTHORISATION: Self = Self::new(0x06, 0x01);
    pub const LOG_OFF: Self = Self::new(0x06, 0x02);
    pub const END_OF_DAY: Self = Self::new(0x06, 0x50);
    pub const ABORT_COMMAND: Self = Self::new(0x06, 0xB0);
    pub const STATUS_ENQUIRY: Self = Self::new(0x05, 0x01);
    pub const DISPLAY_TEXT: Self = Self::new(0x06, 0xE0);

    /// Create a control code from its two bytes
    pub const fn new(class: u8, instr: u8) -> Self {
        Self { class, instr }
    }

    /// Bytes as they appear at the start of an APDU
    pub fn to_bytes(self) -> [u8; 2] {
        [self.class, self.instr]
    }

    /// Check if this is a negative acknowledgement (`84 xx`, `xx != 00`)
    ///
    /// The instruction byte carries the error code.
    pub fn is_negative_ack(self) -> bool {
        self.class == 0x84 && self.instr != 0x00 && self != Self::REPEAT_STATUS_INFO
    }

    /// Check if this is a positive acknowledgement (`80 00` or `84 00`)
    pub fn is_positive_ack(self) -> bool {
        self == Self::PACKET_RECEIVED || self == Self::POSITIVE_ACK
    }

    /// Check if the terminal finishes a transaction with this packet
    pub fn is_final(self) -> bool {
        self == Self::COMPLETION || self == Self::ABORT
    }

    /// Get diagnostic name
    pub fn name(self) -> &'static str {
        if self.class == 0x0F {
            return "RFU for proprietary applications";
        }

        match (self.class, self.instr) {
            (0x01, 0x01) => "RFU",
            (0x04, 0x01) => "Set Date and Time in ECR",
            (0x04, 0x0E) => "Menu-Request",
            (0x04, 0x0F) => "Status-Information",
            (0x04, 0xFF) => "Intermediate-Statusinformation",
            (0x05, 0x01) => "Status-Enquiry",
            (0x05, 0xFF) => "RFU",
            (0x06, 0x00) => "Registration",
            (0x06, 0x01) => "Authorisation",
            (0x06, 0x02) => "Log-Off",
            (0x06, 0x03) => "Account Balance Request",
            (0x06, 0x09) => "Prepaid Top-Up",
            (0x06, 0x0A) => "Tax Free",
            (0x06, 0x0B) => "RFU",
            (0x06, 0x0C) => "TIP",
            (0x06, 0x0F) => "Completion",
            (0x06, 0x10) => "Send Turnover Totals",
            (0x06, 0x11) => "RFU",
            (0x06, 0x12) => "Print Turnover Receipts",
            (0x06, 0x18) => "Reset Terminal",
            (0x06, 0x1A) => "Print System Configuration",
            (0x06, 0x1B) => "Set/Reset Terminal-ID",
            (0x06, 0x1E) => "Abort",
            (0x06, 0x20) => "Repeat Receipt",
            (0x06, 0x21) => "Telephonic Authorisation",
            (0x06, 0x22) => "Pre-Authorisation/Reservation",
            (0x06, 0x23) => "Partial-Reversal of a Pre-Authorisation/Booking of a Reservation",
            (0x06, 0x24) => "Book Total",
            (0x06, 0x25) => "Pre-Authorisation Reversal",
            (0x06, 0x30) => "Reversal",
            (0x06, 0x31) => "Refund",
            (0x06, 0x50) => "End-of-Day",
            (0x06, 0x51) => "Send offline Transactions",
            (0x06, 0x70) => "Diagnosis",
            (0x06, 0x79) => "Selftest",
            (0x06, 0x82) => "RFU",
            (0x06, 0x85) => "Display Text (legacy, use 06 E0)",
            (0x06, 0x86) => "Display Text with Numerical Input (legacy, use 06 E2)",
            (0x06, 0x87) => "PIN-Verification for Customer-Card (legacy, use 06 E3)",
            (0x06, 0x88) => "Display Text with Function-Key Input (legacy, use 06 E1)",
            (0x06, 0x90) => "RFU",
            (0x06, 0x91) => "Set Date and Time in PT",
            (0x06, 0x93) => "Initialisation",
            (0x06, 0x95) => "Change Password",
            (0x06, 0xB0) => "Abort",
            (0x06, 0xC0) => "Read Card",
            (0x06, 0xCE) => "RFU",
            (0x06, 0xD1) => "Print Line",
            (0x06, 0xD3) => "Print Text-Block",
            (0x06, 0xD4) => "RFU",
            (0x06, 0xD8) => "Dial-Up",
            (0x06, 0xD9) => "Transmit Data via Dial-Up",
            (0x06, 0xDA) => "Receive Data via Dial-Up",
            (0x06, 0xDB) => "Hang-Up",
            (0x06, 0xDD) => "Transparent-Mode",
            (0x06, 0xE0) => "Display Text",
            (0x06, 0xE1) => "Display Text with Function-Key Input",
            (0x06, 0xE2) => "Display Text with Numerical Input",
            (0x06, 0xE3) => "PIN-Verification for Customer-Card",
            (0x06, 0xE4) => "Blocked-List Query to ECR",
            (0x08, 0x01) => "Activate Service-Mode",
            (0x08, 0x02) => "Switch Protocol",
            (0x08, 0x10) => "Software-Update",
            (0x08, 0x11) => "Read File",
            (0x08, 0x12) => "Delete File",
            (0x08, 0x20) => "Start OPT Action",
            (0x08, 0x21) => "Set OPT Point-in-Time",
            (0x08, 0x22) => "OPT-Pre-Initialisation",
            (0x08, 0x23) => "Output OPT-Data",
            (0x08, 0x24) => "OPT Out-of-Order",
            (0x08, 0x30) => "Select Language",
            (0x08, 0x40) => "Change Baudrate",
            (0x08, 0x50) => "Activate Card-Reader",
            (0x80, 0x00) => "Positive Acknowledgement",
            (0x84, 0x00) => "Positive Acknowledgement",
            (0x84, 0x9C) => "Repeat Statusinfo",
            (0x84, _) => "Negative Acknowledgement",
            _ => "Unknown",
        }
    }
}

impl From<[u8; 2]> for ControlCode {
    fn from(bytes: [u8; 2]) -> Self {
        Self::new(bytes[0], bytes[1])
    }
}

impl From<ControlCode> for [u8; 2] {
    fn from(code: ControlCode) -> [u8; 2] {
        code.to_bytes()
    }
}

impl fmt::Debug for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlCode({:02X} {:02X})", self.class, self.instr)
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X} {}", self.class, self.instr, self.name())
    }
}

//! Common regex patterns for Vietnamese medical document extraction.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// One letter of Vietnamese text: ASCII letters plus the precomposed
/// vowels with diacritics and đ/Đ.
pub const VIETNAMESE_LETTER: &str = concat!(
    r"[A-Za-z",
    r"\x{00C0}-\x{00C3}\x{00C8}-\x{00CA}\x{00CC}\x{00CD}\x{00D2}-\x{00D5}\x{00D9}\x{00DA}\x{00DD}",
    r"\x{00E0}-\x{00E3}\x{00E8}-\x{00EA}\x{00EC}\x{00ED}\x{00F2}-\x{00F5}\x{00F9}\x{00FA}\x{00FD}",
    r"\x{0102}\x{0103}\x{0110}\x{0111}\x{0128}\x{0129}\x{0168}\x{0169}",
    r"\x{01A0}\x{01A1}\x{01AF}\x{01B0}\x{1EA0}-\x{1EF9}]",
);

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

lazy_static! {
    /// A Vietnamese proper noun: words of Vietnamese letters on one line.
    pub static ref VIETNAMESE_NAME: String =
        format!(r"{l}+(?:[ \t]+{l}+)*", l = VIETNAMESE_LETTER);

    // Person names behind a label and a colon
    pub static ref PATIENT_NAME: Regex = ci(&format!(
        r"(?:họ và tên bệnh nhân|họ tên bệnh nhân|tên bệnh nhân|họ và tên|họ tên|bệnh nhân|người bệnh)[ \t]*:[ \t]*({})",
        *VIETNAMESE_NAME
    ));

    pub static ref DOCTOR_NAME: Regex = ci(&format!(
        r"(?:bác sĩ điều trị|bác sĩ khám bệnh|bác sĩ kê đơn|bác sĩ|bác sỹ|y bác sĩ)[ \t]*:[ \t]*({})",
        *VIETNAMESE_NAME
    ));

    pub static ref DOCTOR_TITLE_NAME: Regex = ci(&format!(
        r"\b(?:bs\.?|ths\.?\s*bs\.?|bsck[12i]+\.?)[ \t]+({})",
        *VIETNAMESE_NAME
    ));

    // Facilities
    pub static ref HOSPITAL_NAME: Regex = ci(
        r"\b((?:bệnh viện|phòng khám|trung tâm y tế|nhà thuốc)[ \t]+[^\n|]+)"
    );

    pub static ref LAB_NAME: Regex = ci(
        r"\b((?:phòng xét nghiệm|trung tâm xét nghiệm|khoa xét nghiệm|trung tâm chẩn đoán|bệnh viện|phòng khám)[ \t]+[^\n|]+)"
    );

    // Document numbers; the code itself is upper case only
    pub static ref BILL_NUMBER: Regex = ci(
        r"(?:số h(?:óa|oá) đơn|h(?:óa|oá) đơn số|mã h(?:óa|oá) đơn|số hđ|số phiếu thu|số phiếu)[ \t]*[:#]?[ \t]*((?-i:[A-Z0-9][A-Z0-9\-/]*))"
    );

    // Labeled dates (D/M/YYYY)
    pub static ref BILL_DATE: Regex = ci(
        r"(?:ngày lập|ngày h(?:óa|oá) đơn|ngày thanh toán|ngày ra viện)[ \t]*:?[ \t]*(\d{1,2}/\d{1,2}/\d{4})"
    );

    pub static ref PRESCRIPTION_DATE: Regex = ci(
        r"(?:ngày kê đơn|ngày kê toa|ngày khám)[ \t]*:?[ \t]*(\d{1,2}/\d{1,2}/\d{4})"
    );

    pub static ref TEST_DATE: Regex = ci(
        r"(?:ngày xét nghiệm|ngày lấy mẫu|ngày trả kết quả)[ \t]*:?[ \t]*(\d{1,2}/\d{1,2}/\d{4})"
    );

    pub static ref ANY_LABELED_DATE: Regex = ci(
        r"ngày[^\n:]*:[ \t]*(\d{1,2}/\d{1,2}/\d{4})"
    );

    /// "ngày 15 tháng 3 năm 2024", as printed at the foot of prescriptions.
    pub static ref DATE_VIETNAMESE_LONG: Regex = ci(
        r"(?:ngày\s+)?(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})"
    );

    pub static ref SIGNED_DATE: Regex = ci(
        r"(ngày\s+\d{1,2}\s+tháng\s+\d{1,2}\s+năm\s+\d{4})"
    );

    // Amounts
    pub static ref TOTAL_AMOUNT: Regex = ci(
        r"(?:tổng cộng|tổng tiền|tổng số tiền|tổng thanh toán|số tiền phải trả)[ \t]*:?[ \t]*(\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d+)?)[ \t]*(?:vnđ|vnd|đồng|đ)?"
    );

    pub static ref DECIMAL_AMOUNT: Regex = Regex::new(r"\d+[.,]\d+").unwrap();

    pub static ref CURRENCY_MARKER: Regex = ci(r"vnđ|vnd|đồng");

    /// Whole-string D/M/YYYY.
    pub static ref DATE_DMY: Regex = Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{4})\s*$").unwrap();

    // Other fields
    pub static ref DIAGNOSIS: Regex = ci(r"(?:chẩn đoán|chuẩn đoán)[ \t]*:[ \t]*([^\n]+)");

    // Table lines
    pub static ref MEDICATION_LINE: Regex = Regex::new(r"^\s*(\d{1,3})\.\s+(.+?)\s*$").unwrap();

    pub static ref MEDICATION_DOSE: Regex = ci(r"(\d+(?:[.,]\d+)?)[ \t]*(mg|ml)\b");

    pub static ref TEST_RESULT_LINE: Regex = Regex::new(
        r"^\s*([^:\n]+?)\s*:\s*(-?\d+(?:[.,]\d+)?)\s*([^\s(]+)?\s*\(([^)]*)\)\s*$"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vietnamese_name_fragment() {
        let re = Regex::new(&format!("^{}$", *VIETNAMESE_NAME)).unwrap();
        assert!(re.is_match("Nguyễn Văn An"));
        assert!(re.is_match("Trần Thị Bích Ngọc"));
        assert!(re.is_match("Đặng Ưng"));
        assert!(!re.is_match("Nguyễn: 123"));
    }

    #[test]
    fn test_patient_name_labels() {
        let caps = PATIENT_NAME.captures("HỌ VÀ TÊN BỆNH NHÂN: Lê Thị Hoa\nTuổi: 45").unwrap();
        assert_eq!(&caps[1], "Lê Thị Hoa");

        let caps = PATIENT_NAME.captures("Bệnh nhân: Phạm Minh Tuấn").unwrap();
        assert_eq!(&caps[1], "Phạm Minh Tuấn");
    }

    #[test]
    fn test_total_amount() {
        let caps = TOTAL_AMOUNT.captures("Tổng cộng: 1.250.000 vnđ").unwrap();
        assert_eq!(&caps[1], "1.250.000");
        assert!(caps[0].ends_with("vnđ"));
    }

    #[test]
    fn test_bill_number_labels() {
        let caps = BILL_NUMBER.captures("Số hóa đơn: HD2024-00123").unwrap();
        assert_eq!(&caps[1], "HD2024-00123");

        let caps = BILL_NUMBER.captures("Số phiếu thu: PT2024-001").unwrap();
        assert_eq!(&caps[1], "PT2024-001");

        let caps = BILL_NUMBER.captures("SỐ PHIẾU THU: PT2024-002").unwrap();
        assert_eq!(&caps[1], "PT2024-002");

        let caps = BILL_NUMBER.captures("Hóa đơn số 0012345").unwrap();
        assert_eq!(&caps[1], "0012345");

        // A lower-case word after the label is not a code
        assert!(BILL_NUMBER.captures("Số phiếu khám bệnh").is_none());
    }

    #[test]
    fn test_doctor_title() {
        let caps = DOCTOR_TITLE_NAME.captures("BS. Trần Văn Bình").unwrap();
        assert_eq!(&caps[1], "Trần Văn Bình");
    }

    #[test]
    fn test_test_result_line() {
        let caps = TEST_RESULT_LINE.captures("Glucose: 5.6 mmol/L (3.9 - 6.1)").unwrap();
        assert_eq!(&caps[1], "Glucose");
        assert_eq!(&caps[2], "5.6");
        assert_eq!(&caps[3], "mmol/L");
        assert_eq!(&caps[4], "3.9 - 6.1");

        assert!(TEST_RESULT_LINE.captures("Ngày xét nghiệm: 15/03/2024").is_none());
    }
}

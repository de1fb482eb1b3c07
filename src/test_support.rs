//! Certificate hierarchies for unit tests.

use rcgen::{
    date_time_ymd, BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair,
};

pub const TEST_ROOT_CN: &str = "Fake LE Root X1";
pub const TEST_INTERMEDIATE_CN: &str = "Fake LE Intermediate X1";

pub struct TestAuthority {
    pub key: KeyPair,
    pub cert: Certificate,
}

impl TestAuthority {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }
}

pub struct TestLeaf {
    pub key: KeyPair,
    pub cert: Certificate,
}

impl TestLeaf {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pkcs8_der(&self) -> Vec<u8> {
        self.key.serialize_der()
    }
}

fn ca_params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
}

pub fn root_ca(cn: &str) -> TestAuthority {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(cn).self_signed(&key).unwrap();
    TestAuthority { key, cert }
}

pub fn intermediate_ca(cn: &str, parent: &TestAuthority) -> TestAuthority {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(cn)
        .signed_by(&key, &parent.cert, &parent.key)
        .unwrap();
    TestAuthority { key, cert }
}

pub fn leaf(names: &[&str], issuer: &TestAuthority) -> TestLeaf {
    leaf_issued_on(names, issuer, 2025, 1, 1)
}

pub fn leaf_issued_on(
    names: &[&str],
    issuer: &TestAuthority,
    year: i32,
    month: u8,
    day: u8,
) -> TestLeaf {
    let key = KeyPair::generate().unwrap();
    let mut params =
        CertificateParams::new(names.iter().map(|name| name.to_string()).collect::<Vec<_>>())
            .unwrap();
    params.distinguished_name.push(DnType::CommonName, names[0]);
    params.not_before = date_time_ymd(year, month, day);
    params.not_after = date_time_ymd(year + 1, month, day);
    let cert = params
        .signed_by(&key, &issuer.cert, &issuer.key)
        .unwrap();
    TestLeaf { key, cert }
}

/// Root, intermediate and a leaf for `names` issued by the intermediate
pub fn hierarchy(names: &[&str]) -> (TestAuthority, TestAuthority, TestLeaf) {
    let root = root_ca(TEST_ROOT_CN);
    let intermediate = intermediate_ca(TEST_INTERMEDIATE_CN, &root);
    let leaf = leaf(names, &intermediate);
    (root, intermediate, leaf)
}

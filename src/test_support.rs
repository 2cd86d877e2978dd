//! Key and certificate fixtures generated at test time.

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Name, X509};
use std::sync::OnceLock;

const X509_VERSION_3: i32 = 2;

static RSA_KEY: OnceLock<PKey<Private>> = OnceLock::new();
static OTHER_RSA_KEY: OnceLock<PKey<Private>> = OnceLock::new();

/// Shared 2048-bit key; generation is slow enough to be worth caching.
pub fn rsa_key() -> &'static PKey<Private> {
    RSA_KEY.get_or_init(|| rsa_key_of(2048))
}

pub fn other_rsa_key() -> &'static PKey<Private> {
    OTHER_RSA_KEY.get_or_init(|| rsa_key_of(2048))
}

pub fn rsa_key_of(bits: u32) -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap()
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut builder = X509Name::builder().unwrap();
    builder.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    builder.build()
}

fn build_cert(
    subject_key: &PKey<Private>,
    subject_cn: &str,
    issuer: Option<(&PKey<Private>, &X509)>,
    ca: bool,
) -> X509 {
    let mut builder = X509::builder().unwrap();
    builder.set_version(X509_VERSION_3).unwrap();
    let serial = {
        let mut bn = BigNum::new().unwrap();
        bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        bn.to_asn1_integer().unwrap()
    };
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name(subject_cn)).unwrap();
    builder.set_pubkey(subject_key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    match issuer {
        Some((issuer_key, issuer_cert)) => {
            builder.set_issuer_name(issuer_cert.subject_name()).unwrap();
            builder.sign(issuer_key, MessageDigest::sha256()).unwrap();
        }
        None => {
            builder.set_issuer_name(&name(subject_cn)).unwrap();
            builder.sign(subject_key, MessageDigest::sha256()).unwrap();
        }
    }
    builder.build()
}

pub fn self_signed(key: &PKey<Private>, cn: &str) -> X509 {
    build_cert(key, cn, None, true)
}

pub fn issued_by(
    key: &PKey<Private>,
    cn: &str,
    issuer_key: &PKey<Private>,
    issuer_cert: &X509,
) -> X509 {
    build_cert(key, cn, Some((issuer_key, issuer_cert)), false)
}

pub fn cert_pem(cert: &X509) -> Vec<u8> {
    cert.to_pem().unwrap()
}

/// An arbitrary body wrapped as a single PEM block.
pub fn pem_block(label: &str, body: &[u8]) -> String {
    pem::encode(&pem::Pem::new(label, body))
}

/// PKCS#8 `PRIVATE KEY` encoding.
pub fn key_pem(key: &PKey<Private>) -> Vec<u8> {
    key.private_key_to_pem_pkcs8().unwrap()
}

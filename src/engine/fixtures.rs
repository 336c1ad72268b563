//! Shared fixture data for the engine tests.
//!
//! One seeded in-memory store with a handful of alerts mirrored across
//! every index the way the ingestion pipeline would write them, so each
//! engine test exercises its own index against consistent data.

use crate::engine::healpix::{ang2pix_nest, ORDER};
use crate::models::RowKey;
use crate::store::provision::provisioned_memory_store;
use crate::store::{Index, MemoryStore};

/// Center of the seeded alert field.
pub const FIELD_RA: f64 = 120.0;
pub const FIELD_DEC: f64 = 30.0;

pub const JD_EPOCH1: f64 = 2459000.5;
pub const JD_EPOCH2: f64 = 2459002.5;

/// Mirror one alert into the main table and the pixel/time indices.
pub fn seed_alert(
    store: &MemoryStore,
    oid: &str,
    jd: f64,
    ra: f64,
    dec: f64,
    extra: &[(&str, &str)],
) {
    let jd_s = format!("{}", jd);
    let ra_s = format!("{}", ra);
    let dec_s = format!("{}", dec);
    let mut cells: Vec<(&str, &str)> = vec![
        ("i:objectId", oid),
        ("i:jd", &jd_s),
        ("i:ra", &ra_s),
        ("i:dec", &dec_s),
    ];
    cells.extend_from_slice(extra);

    let main_key = format!("{}_{}", oid, jd_s);
    store.insert(Index::Objects.table_name(), &main_key, &cells);

    let pixel = ang2pix_nest(ORDER, ra, dec);
    let pixel_key = RowKey::pixel_time(pixel, jd).encode();
    store.insert(Index::Pixel.table_name(), &pixel_key, &cells);

    let time_key = format!("{}_{}", jd_s, oid);
    store.insert(Index::Time.table_name(), &time_key, &cells);
}

/// The standard fixture store. Contents:
///
/// - `OBJ1`: two epochs near the field center, g then r band, supernova
///   scores above threshold, one upper limit and one bad-quality row
/// - `OBJ2`: one epoch, crossmatched to `RRLyr`, TNS-classified `SN Ia`
/// - `SSO1`: one epoch, Solar-System designation `2010JO69`, on a tracklet
/// - `FAR1`: one epoch far outside the field
pub fn seeded_store() -> MemoryStore {
    let store = provisioned_memory_store();

    seed_alert(
        &store,
        "OBJ1",
        JD_EPOCH1,
        FIELD_RA,
        FIELD_DEC,
        &[
            ("i:candid", "1001"),
            ("i:fid", "1"),
            ("i:magpsf", "18.2"),
            ("i:sigmapsf", "0.08"),
            ("i:jdstarthist", "2459000.5"),
            ("d:cdsxmatch", "Unknown"),
            ("d:snn_snia_vs_nonia", "0.9"),
            ("d:snn_sn_vs_all", "0.8"),
        ],
    );
    seed_alert(
        &store,
        "OBJ1",
        JD_EPOCH1 + 0.05,
        FIELD_RA + 0.001,
        FIELD_DEC + 0.001,
        &[
            ("i:candid", "1002"),
            ("i:fid", "2"),
            ("i:magpsf", "17.7"),
            ("i:sigmapsf", "0.06"),
            ("i:jdstarthist", "2459000.5"),
            ("d:cdsxmatch", "Unknown"),
            ("d:snn_snia_vs_nonia", "0.9"),
            ("d:snn_sn_vs_all", "0.8"),
        ],
    );
    seed_alert(
        &store,
        "OBJ2",
        JD_EPOCH2,
        FIELD_RA + 0.5,
        FIELD_DEC + 0.2,
        &[
            ("i:candid", "2001"),
            ("i:fid", "1"),
            ("i:magpsf", "19.1"),
            ("i:sigmapsf", "0.12"),
            ("i:jdstarthist", "2458990.5"),
            ("d:cdsxmatch", "RRLyr"),
        ],
    );
    seed_alert(
        &store,
        "SSO1",
        JD_EPOCH2,
        FIELD_RA + 1.0,
        FIELD_DEC - 0.5,
        &[
            ("i:candid", "4001"),
            ("i:fid", "2"),
            ("i:magpsf", "20.0"),
            ("i:sigmapsf", "0.2"),
            ("i:jdstarthist", "2459002.5"),
            ("i:ssnamenr", "2010JO69"),
            ("d:cdsxmatch", "Unknown"),
            ("d:roid", "3"),
            ("d:tracklet", "TRCK_20210810_055711"),
        ],
    );
    seed_alert(
        &store,
        "FAR1",
        JD_EPOCH1,
        200.0,
        -40.0,
        &[
            ("i:candid", "3001"),
            ("i:fid", "1"),
            ("i:magpsf", "18.8"),
            ("i:jdstarthist", "2459000.5"),
            ("d:cdsxmatch", "Unknown"),
        ],
    );

    // classification index, keyed {class}_{jd}
    for (class, jd, oid, candid) in [
        ("SN candidate", JD_EPOCH1, "OBJ1", "1001"),
        ("SN candidate", JD_EPOCH1 + 0.05, "OBJ1", "1002"),
        ("RRLyr", JD_EPOCH2, "OBJ2", "2001"),
        ("Solar System", JD_EPOCH2, "SSO1", "4001"),
    ] {
        let key = RowKey::class_time(class, jd).encode();
        store.insert(
            Index::Class.table_name(),
            &key,
            &[
                ("i:objectId", oid),
                ("i:jd", &format!("{}", jd)),
                ("i:candid", candid),
                ("i:ra", "120.0"),
                ("i:dec", "30.0"),
            ],
        );
    }

    // externally-classified index
    let tns_key = RowKey::class_time("SN Ia", JD_EPOCH2).encode();
    store.insert(
        Index::TnsClass.table_name(),
        &tns_key,
        &[
            ("i:objectId", "OBJ2"),
            ("i:jd", &format!("{}", JD_EPOCH2)),
            ("i:candid", "2001"),
            ("i:ra", "120.5"),
            ("i:dec", "30.2"),
        ],
    );

    // Solar-System designation index, keyed {designation}_{jd}
    let sso_key = format!("2010JO69_{}", JD_EPOCH2);
    store.insert(
        Index::SsoName.table_name(),
        &sso_key,
        &[
            ("i:objectId", "SSO1"),
            ("i:jd", &format!("{}", JD_EPOCH2)),
            ("i:candid", "4001"),
            ("i:ssnamenr", "2010JO69"),
            ("i:magpsf", "20.0"),
        ],
    );

    // tracklet index, keyed {tracklet}_{candid}
    store.insert(
        Index::Tracklet.table_name(),
        "TRCK_20210810_055711_4001",
        &[
            ("i:objectId", "SSO1"),
            ("i:jd", &format!("{}", JD_EPOCH2)),
            ("i:candid", "4001"),
        ],
    );

    // photometry history of OBJ1
    store.insert(
        Index::Upper.table_name(),
        &format!("OBJ1_{}", JD_EPOCH1 - 1.0),
        &[
            ("i:objectId", "OBJ1"),
            ("i:jd", &format!("{}", JD_EPOCH1 - 1.0)),
            ("i:fid", "1"),
            ("i:diffmaglim", "20.5"),
        ],
    );
    // bad-quality row at the same timestamp as a valid row, up to float noise
    store.insert(
        Index::UpperValid.table_name(),
        &format!("OBJ1_{}", JD_EPOCH1),
        &[
            ("i:objectId", "OBJ1"),
            ("i:jd", "2459000.5000004"),
            ("i:fid", "1"),
            ("i:magpsf", "18.3"),
        ],
    );
    store.insert(
        Index::UpperValid.table_name(),
        &format!("OBJ1_{}", JD_EPOCH1 - 2.0),
        &[
            ("i:objectId", "OBJ1"),
            ("i:jd", &format!("{}", JD_EPOCH1 - 2.0)),
            ("i:fid", "2"),
            ("i:magpsf", "18.9"),
        ],
    );

    // anomaly index, keyed {jd}_{objectId}
    store.insert(
        Index::Anomaly.table_name(),
        &format!("{}_OBJ1", JD_EPOCH1 + 0.05),
        &[
            ("i:objectId", "OBJ1"),
            ("i:jd", &format!("{}", JD_EPOCH1 + 0.05)),
            ("i:candid", "1002"),
            ("d:anomaly_score", "-0.71"),
        ],
    );

    // name resolvers, lower-cased keys
    store.insert(
        Index::TnsResolver.table_name(),
        "sn 2021abc_obj2",
        &[
            ("d:fullname", "SN 2021abc"),
            ("d:internalname", "OBJ2"),
            ("d:type", "SN Ia"),
        ],
    );
    store.insert(
        Index::TnsResolver.table_name(),
        "sn 2021xyz_obj9",
        &[
            ("d:fullname", "SN 2021xyz"),
            ("d:internalname", "OBJ9"),
            ("d:type", "SN II"),
        ],
    );
    store.insert(
        Index::SsoResolver.table_name(),
        "2010jo69-1",
        &[
            ("i:ssnamenr", "2010JO69"),
            ("i:name", "2010 JO69"),
            ("i:number", "541276"),
        ],
    );

    // nightly statistics
    store.insert(
        Index::Statistics.table_name(),
        "nightly_20210301",
        &[
            ("basic:raw", "250000"),
            ("basic:sci", "180000"),
            ("basic:fields", "410"),
            ("basic:exposures", "620"),
            ("class:SN candidate", "320"),
        ],
    );
    store.insert(
        Index::Statistics.table_name(),
        "nightly_20210302",
        &[
            ("basic:raw", "260000"),
            ("basic:sci", "190000"),
            ("basic:fields", "405"),
            ("basic:exposures", "615"),
            ("class:SN candidate", "298"),
        ],
    );

    store
}

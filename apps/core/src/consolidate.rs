use std::collections::HashMap;

use crate::model::DocumentRecord;

/// Collapse records that point at the same container file.
///
/// Each group keeps its highest-rated member; on equal ratings the first one
/// seen stays. Survivors take the slot of their group's first member, so an
/// engine-ordered input stays in engine order and a second pass is a no-op.
pub fn consolidate(records: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
    let mut slot_by_key: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut survivors: Vec<DocumentRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.container_url().to_string();
        match slot_by_key.get(&key) {
            Some(&slot) => {
                if outranks(&record, &survivors[slot]) {
                    survivors[slot] = record;
                }
            }
            None => {
                slot_by_key.insert(key, survivors.len());
                survivors.push(record);
            }
        }
    }

    survivors
}

/// Strictly greater rating; unparsable ratings lose to any parsable one.
fn outranks(candidate: &DocumentRecord, current: &DocumentRecord) -> bool {
    match (candidate.rating(), current.rating()) {
        (Some(candidate), Some(current)) => candidate > current,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

// Mapping over a JSON table file: persistence across handles and shared files.
use sheetmap::api::{ErrorKind, FileTable, Json, SheetMap};

#[test]
fn entries_survive_reopen() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");

    {
        let table = FileTable::create(&path).expect("create");
        let mut map: SheetMap<String, i64, _> = SheetMap::new(table);
        map.set("apples", &3i64).expect("set");
        map.set("pears", &5i64).expect("set");
        map.set("apples", &4i64).expect("update");
    }

    let table = FileTable::open(&path).expect("open");
    let map: SheetMap<String, i64, _> = SheetMap::new(table);
    assert_eq!(map.get("apples").expect("get"), 4);
    assert_eq!(map.len().expect("len"), 2);
}

#[test]
fn two_handles_see_each_others_writes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");

    let mut writer: SheetMap<String, String, _, _> =
        SheetMap::with_codec(FileTable::create(&path).expect("create"), Json);
    let reader: SheetMap<String, String, _, _> =
        SheetMap::with_codec(FileTable::open(&path).expect("open"), Json);

    writer.set("key", "value").expect("set");
    assert_eq!(reader.get("key").expect("reader sees write"), "value");

    writer.delete("key").expect("delete");
    assert_eq!(reader.get("key").expect_err("gone").kind(), ErrorKind::NotFound);
}

#[test]
fn json_codec_file_is_human_readable() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");

    let mut map: SheetMap<String, String, _, _> =
        SheetMap::with_codec(FileTable::create(&path).expect("create"), Json);
    map.set("greeting", "hello").expect("set");

    let text = std::fs::read_to_string(&path).expect("read");
    let rows: Vec<(String, String)> = serde_json::from_str(&text).expect("rows");
    assert_eq!(
        rows,
        [("\"greeting\"".to_string(), "\"hello\"".to_string())]
    );
}

#[test]
fn pop_last_and_clear_rewrite_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");
    let mut map: SheetMap<String, String, _> =
        SheetMap::new(FileTable::open_or_create(&path).expect("open"));

    map.set("a", "1").expect("set");
    map.set("b", "2").expect("set");
    assert_eq!(
        map.pop_last().expect("pop"),
        ("b".to_string(), "2".to_string())
    );
    map.clear().expect("clear");
    assert!(map.is_empty().expect("empty"));
    assert_eq!(map.pop_last().expect_err("empty").kind(), ErrorKind::EmptyCollection);
}

#[test]
fn vanished_file_is_a_failure_not_a_miss() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");
    let mut map: SheetMap<String, String, _> =
        SheetMap::new(FileTable::create(&path).expect("create"));
    map.set("k", "stored").expect("set");
    std::fs::remove_file(&path).expect("remove");

    let err = map
        .get_or("k", "fallback".to_string())
        .expect_err("table failure");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(map.get_opt("k").expect_err("table failure").kind(), ErrorKind::Io);
    assert_eq!(map.contains("k").expect_err("table failure").kind(), ErrorKind::Io);
}

#[test]
fn create_does_not_clobber_existing_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");
    let mut map: SheetMap<String, String, _> =
        SheetMap::new(FileTable::create(&path).expect("create"));
    map.set("k", "v").expect("set");

    let err = FileTable::create(&path).expect_err("exists");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(map.get("k").expect("kept"), "v");
}

#[test]
fn corrupt_file_surfaces_as_corrupt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("table.json");
    std::fs::write(&path, "[[\"only-one-cell\"]]").expect("write");

    let map: SheetMap<String, String, _> = SheetMap::new(FileTable::open(&path).expect("open"));
    assert_eq!(map.len().expect_err("corrupt").kind(), ErrorKind::Corrupt);
}

/*!

This is the long-form manual for `field_reconciliation` and `cardrec`.

## The reconciliation model

Every field of a captured business card (email, last name, postal code, ...)
arrives with up to five candidate values, one per capture channel:

| slot      | origin                                   |
|-----------|------------------------------------------|
| `ocr`     | automated extraction from the card image |
| `db`      | the stored database record               |
| `manual1` | first independent manual keying          |
| `manual2` | second independent manual keying         |
| `manual3` | third independent manual keying          |

The slot order above is also the counting order of the consensus pass and
its tie-break order.

Three passes run at load time:

1. **Suppression.** Independent keying is expensive, so once two sources
already agree the remaining manual slots carry no information and are
blanked from the *display* copy of the row. The chain short-circuits: if
`db` and `ocr` agree, all three manual slots are blanked; otherwise if
`manual1` agrees with `ocr` or `db`, the last two are blanked; otherwise if
`manual2` agrees with any earlier slot, the last one is blanked. The
original five values are never modified.

2. **Consensus.** The most frequent non-empty value among the *original*
candidates becomes the initial working value when it occurs at least twice.
A frequency tie goes to the value seen first in slot order.

3. **Auto-confirm.** A row whose original candidates contain any repeated
value starts out confirmed (locked): multi-source agreement is considered
sufficient evidence without operator review.

Fields marked *freeform* (memos, free input) are exempt from all three
passes: nothing is suppressed, nothing matches, and confirmation is always
an explicit operator action.

After load, the operator edits working values and toggles per-row
confirmation; a confirmed row ignores edits until unconfirmed. The
table-level indicator is checked when every row is confirmed, unchecked
when none is, indeterminate otherwise, and toggling it fans out to every
row in one batch.

## Input formats of `cardrec`

The driver reads a JSON batch configuration and one or more capture files.

### Capture files

One row per field, values in slot order. With provider `csv`:

```text
label,ocr,db,manual1,manual2,manual3
email,sample@example.com,sample@example.com,typo@example.com,,
last name,Yamada,dbYamada,,,
```

The label column is optional (`labelColumnIndex` absent means rows are
matched to the configured fields by position). Provider `excel` reads
the same shape from the first worksheet of an `.xlsx` file, or from the
sheet named by `excelWorksheetName`.

### Batch configuration

```json
{
  "outputSettings": { "batchName": "batch-001", "operatorName": "editor" },
  "captureFileSources": [
    { "provider": "csv", "filePath": "captures.csv", "labelColumnIndex": 1,
      "firstValueColumnIndex": 2, "firstFieldRowIndex": 2 }
  ],
  "fields": [
    { "group": "1", "label": "email" },
    { "group": "7", "label": "memo", "kind": "freeform" }
  ],
  "operations": [
    { "op": "edit", "field": "email", "value": "corrected@example.com" },
    { "op": "confirm", "field": "email", "confirmed": true },
    { "op": "confirmAll", "confirmed": true }
  ]
}
```

Indices are 1-based and accept either a JSON number or a string. The
optional `operations` array replays a recorded operator action log before
the summary is produced, which makes a whole session reproducible from
files alone.

The summary is printed as JSON (and written to `--out` when given). With
`--reference`, the produced summary is compared against an expected summary
file and any difference is reported as an error.

*/

//! UI text lookup. Keys are opaque; an unknown key is shown as is.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use shared_types::ReservableType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lang {
    #[default]
    Sl,
    En,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Sl => "sl",
            Lang::En => "en",
        }
    }

    pub fn other(&self) -> Lang {
        match self {
            Lang::Sl => Lang::En,
            Lang::En => Lang::Sl,
        }
    }
}

// (key, slovenian, english)
const ENTRIES: &[(&str, &str, &str)] = &[
    ("app.title", "Rezervacije", "Reservations"),
    ("filter.set", "Nabor", "Set"),
    ("filter.type", "Vrsta", "Type"),
    ("filter.date", "Datum", "Date"),
    ("filter.previous_day", "Prejšnji dan", "Previous day"),
    ("filter.today", "Danes", "Today"),
    ("filter.next_day", "Naslednji dan", "Next day"),
    ("selector.choose", "Izberite objekte", "Choose objects"),
    ("selector.search", "Iskanje ...", "Search ..."),
    ("selector.selected", "Izbranih", "Selected"),
    ("selector.all_shown", "Prikazani so vsi objekti", "Showing all objects"),
    ("selector.clear", "Počisti izbiro", "Clear selection"),
    ("selector.no_match", "Ni zadetkov", "No matches"),
    ("catalog.loading", "Nalaganje objektov ...", "Loading objects ..."),
    ("catalog.error", "Napaka pri pridobivanju objektov.", "Could not load objects."),
    ("grid.loading", "Nalaganje rezervacij ...", "Loading reservations ..."),
    ("grid.background", "Nalaganje sosednjih dni ...", "Loading nearby days ..."),
    ("grid.error_title", "Prišlo je do napake", "Something went wrong"),
    ("grid.retry", "Poskusi znova", "Try again"),
    ("grid.empty", "Na voljo ni nobenih objektov", "No objects available"),
    ("grid.overview", "Pregled rezervacij za", "Reservations for"),
    ("grid.overlaps", "Nekatere rezervacije se prekrivajo.", "Some reservations overlap."),
    ("grid.hidden", "Rezervacije izven prikazanih ur", "Reservations outside the shown hours"),
    ("modal.title", "Podrobnosti rezervacije", "Reservation details"),
    ("modal.name", "Naziv", "Title"),
    ("modal.time", "Čas", "Time"),
    ("modal.date", "Datum", "Date"),
    ("modal.created_by", "Rezerviral", "Reserved by"),
    ("modal.owners", "Lastniki", "Owners"),
    ("modal.requirements", "Zahteve", "Requirements"),
    ("modal.delete", "Izbriši", "Delete"),
    ("modal.deleting", "Brisanje ...", "Deleting ..."),
    ("modal.close", "Zapri", "Close"),
    ("draft.title", "Nova rezervacija", "New reservation"),
    ("draft.reason", "Namen", "Purpose"),
    ("draft.start", "Začetek", "Start"),
    ("draft.end", "Konec", "End"),
    ("draft.note", "Osnutek se ne pošlje na strežnik.", "Drafts are not sent to the server."),
    ("types.classroom", "Učilnica", "Classroom"),
    ("types.vehicle", "Vozilo", "Vehicle"),
    ("types.teacher", "Učitelj", "Teacher"),
    ("types.activity", "Aktivnost", "Activity"),
    ("types.equipment", "Oprema", "Equipment"),
    ("types.group", "Skupina", "Group"),
];

static LABELS: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    ENTRIES
        .iter()
        .map(|(key, sl, en)| (*key, (*sl, *en)))
        .collect()
});

pub fn label(lang: Lang, key: &str) -> String {
    match LABELS.get(key) {
        Some((sl, en)) => match lang {
            Lang::Sl => sl.to_string(),
            Lang::En => en.to_string(),
        },
        None => key.to_string(),
    }
}

pub fn type_label(lang: Lang, kind: ReservableType) -> String {
    label(lang, &format!("types.{}", kind.as_str()))
}

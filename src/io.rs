use crate::model::{Assignment, Role, Staff, StaffId};
use crate::scheduler::{Conflict, ScheduleGenerationStepReport};
use anyhow::{bail, Context};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use std::io::Write;
use std::path::Path;

/// Import de soignants depuis CSV:
/// header `id,display_name,role,unit[,skills][,seniority_years][,max_hours][,min_hours]`
pub fn import_staff_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Staff>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let display = rec.get(1).context("missing display_name")?.trim();
        let role = rec.get(2).context("missing role")?.trim();
        let unit = rec.get(3).context("missing unit")?.trim();
        if display.is_empty() || role.is_empty() || unit.is_empty() {
            bail!("invalid staff row {} (empty field)", line + 1);
        }
        let id = if id.is_empty() {
            StaffId::random()
        } else {
            StaffId::new(id)
        };
        let mut staff = Staff::new(id, display, Role::parse(role), unit);
        if let Some(skills) = optional(rec.get(4)) {
            staff = staff.with_skills(
                skills
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            );
        }
        if let Some(years) = optional(rec.get(5)) {
            staff.seniority_years = years
                .parse()
                .with_context(|| format!("invalid seniority_years for {}", staff.id))?;
        }
        if let Some(max) = optional(rec.get(6)) {
            staff.max_hours = Some(
                max.parse()
                    .with_context(|| format!("invalid max_hours for {}", staff.id))?,
            );
        }
        if let Some(min) = optional(rec.get(7)) {
            staff.min_hours = Some(
                min.parse()
                    .with_context(|| format!("invalid min_hours for {}", staff.id))?,
            );
        }
        out.push(staff);
    }
    Ok(out)
}

fn optional(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

/// Export CSV des affectations: header `date,shift,staff_id,status,notes`
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let w = WriterBuilder::new().has_headers(true).from_path(path)?;
    write_assignments(w, assignments)
}

pub fn write_assignments_csv<W: Write>(out: W, assignments: &[Assignment]) -> anyhow::Result<()> {
    write_assignments(Writer::from_writer(out), assignments)
}

fn write_assignments<W: Write>(mut w: Writer<W>, assignments: &[Assignment]) -> anyhow::Result<()> {
    w.write_record(["date", "shift", "staff_id", "status", "notes"])?;
    for a in assignments {
        let date = a.date.to_string();
        w.write_record([
            date.as_str(),
            a.shift.as_str(),
            a.staff_id.as_str(),
            a.status.label(),
            a.notes.as_deref().unwrap_or(""),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV du journal de génération:
/// header `sequence,date,shift,outcome,required,candidates,eligible,chosen,violated,relaxed`
pub fn export_report_csv<P: AsRef<Path>>(
    path: P,
    report: &[ScheduleGenerationStepReport],
) -> anyhow::Result<()> {
    let w = WriterBuilder::new().has_headers(true).from_path(path)?;
    write_report(w, report)
}

pub fn write_report_csv<W: Write>(
    out: W,
    report: &[ScheduleGenerationStepReport],
) -> anyhow::Result<()> {
    write_report(Writer::from_writer(out), report)
}

fn write_report<W: Write>(
    mut w: Writer<W>,
    report: &[ScheduleGenerationStepReport],
) -> anyhow::Result<()> {
    w.write_record([
        "sequence",
        "date",
        "shift",
        "outcome",
        "required",
        "candidates",
        "eligible",
        "chosen",
        "violated",
        "relaxed",
    ])?;
    for step in report {
        let chosen = step
            .chosen
            .iter()
            .map(|c| c.staff_id.as_str())
            .collect::<Vec<_>>()
            .join(";");
        w.write_record([
            step.sequence.to_string(),
            step.date.to_string(),
            step.shift.to_string(),
            step.outcome.label().to_string(),
            step.required.to_string(),
            step.candidates_considered.to_string(),
            step.eligible.to_string(),
            chosen,
            step.violated.join(";"),
            step.relaxed.join(";"),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV des conflits: header `staff_id,date_a,shift_a,date_b,shift_b,kind`
pub fn export_conflicts_csv<P: AsRef<Path>>(path: P, conflicts: &[Conflict]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["staff_id", "date_a", "shift_a", "date_b", "shift_b", "kind"])?;
    for c in conflicts {
        let (date_b, shift_b) = c
            .slot_b
            .as_ref()
            .map(|b| (b.date.to_string(), b.shift.to_string()))
            .unwrap_or_default();
        w.write_record([
            c.staff_id.to_string(),
            c.slot_a.date.to_string(),
            c.slot_a.shift.to_string(),
            date_b,
            shift_b,
            c.kind.label().to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

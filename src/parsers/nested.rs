use crate::{
    Composition, Count, IsotopeLabel, MassTable,
    errors::{ElemassError, InvalidFormulaKind, Result},
};

/// Parses formulae containing parenthesised groups, like `Ca5(PO4)3(OH)`
///
/// The formula is scanned backwards, so that every count has already been seen by the time the token it multiplies
/// comes up. At the top level, runs of digits are held until the next `)` or element symbol claims them. Groups are
/// sliced out whole and parsed recursively, and element symbols are matched against the table's symbol list
/// longest-first. A parenthesised number like the `(2)` in `H(2)O` multiplies the element to its left instead of
/// forming a group.
pub(super) fn formula(table: &MassTable, text: &str) -> Result<Composition> {
    let bytes = text.as_bytes();
    let invalid = |kind| Box::new(ElemassError::invalid_formula(text, kind));

    let mut composition = Composition::default();
    let mut resolved = Vec::new();
    let mut depth = 0_u32;
    let mut group_close = 0;
    let mut group_count: Count = 1;
    let mut pending_count: Option<Count> = None;
    // NOTE: `boundary` marks the end (exclusive) of the digits trailing the token currently under scan
    let mut boundary = bytes.len();
    let mut at = bytes.len();

    while at > 0 {
        let index = at - 1;
        let byte = bytes[index];

        if depth > 0 {
            match byte {
                b')' => depth += 1,
                b'(' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &text[index + 1..group_close];
                        if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
                            let count: Count = inner
                                .parse()
                                .map_err(|_| invalid(InvalidFormulaKind::AtomCount))?;
                            let scaled = count
                                .checked_mul(group_count)
                                .ok_or_else(|| invalid(InvalidFormulaKind::CountOverflow))?;
                            if pending_count.replace(scaled).is_some() {
                                return Err(invalid(InvalidFormulaKind::DanglingCount));
                            }
                        } else {
                            let mut group = formula(table, inner)?;
                            group
                                .checked_scale(group_count)
                                .ok_or_else(|| invalid(InvalidFormulaKind::CountOverflow))?;
                            resolved.push(group);
                        }
                        boundary = index;
                        group_count = 1;
                    }
                }
                _ => (),
            }
            at = index;
            continue;
        }

        match byte {
            b')' => {
                depth = 1;
                group_close = index;
                group_count = if at == boundary {
                    1
                } else {
                    text[at..boundary]
                        .parse()
                        .map_err(|_| invalid(InvalidFormulaKind::GroupCoefficient))?
                };
                at = index;
            }
            b'(' => return Err(invalid(InvalidFormulaKind::UnbalancedParenthesis)),
            b'-' | b'0'..=b'9' => at = index,
            _ => {
                let mut count: Count = if at == boundary {
                    1
                } else {
                    text[at..boundary]
                        .parse()
                        .map_err(|_| invalid(InvalidFormulaKind::AtomCount))?
                };
                if let Some(pending) = pending_count.take() {
                    count = count
                        .checked_mul(pending)
                        .ok_or_else(|| invalid(InvalidFormulaKind::CountOverflow))?;
                }

                let (symbol_end, mass_number) = if byte == b']' {
                    let open = text[..index]
                        .rfind('[')
                        .ok_or_else(|| invalid(InvalidFormulaKind::IsotopeTag))?;
                    let mass_number = text[open + 1..index]
                        .parse::<u32>()
                        .map_err(|_| invalid(InvalidFormulaKind::IsotopeTag))?;
                    (open, Some(mass_number))
                } else {
                    (at, None)
                };

                let prefix = &text[..symbol_end];
                let Some(symbol) = table
                    .symbols()
                    .iter()
                    .find(|symbol| prefix.ends_with(symbol.as_str()))
                else {
                    // Name the whole trailing alphabetic run in the error, not just its last character
                    let start = prefix
                        .rfind(|c: char| !c.is_ascii_alphabetic())
                        .map_or(0, |position| position + 1);
                    let run = &prefix[start..];
                    return Err(if run.is_empty() {
                        invalid(InvalidFormulaKind::Grammar)
                    } else {
                        Box::new(ElemassError::unknown_element(run))
                    });
                };

                let label = match mass_number {
                    Some(mass_number) => IsotopeLabel::new_isotope(symbol, mass_number),
                    None => IsotopeLabel::new(symbol),
                };
                composition
                    .checked_accumulate(label, count)
                    .ok_or_else(|| invalid(InvalidFormulaKind::CountOverflow))?;

                boundary = symbol_end - symbol.len();
                at = boundary;
            }
        }
    }

    if depth > 0 {
        return Err(invalid(InvalidFormulaKind::UnbalancedParenthesis));
    }
    if pending_count.is_some() || boundary > 0 {
        return Err(invalid(InvalidFormulaKind::DanglingCount));
    }
    for group in resolved {
        composition
            .checked_merge(group)
            .ok_or_else(|| invalid(InvalidFormulaKind::CountOverflow))?;
    }
    Ok(composition)
}

// Module Tests ========================================================================================================

use serde::Serialize;

use crate::operation::FileOperation;

/// A safer way to get the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Alternative {
    pub id: &'static str,
    pub description: &'static str,
}

const DELETE: &[Alternative] = &[
    Alternative {
        id: "trash",
        description: "Move to trash instead of deleting permanently",
    },
    Alternative {
        id: "backup_then_delete",
        description: "Create a backup first, then delete",
    },
    Alternative {
        id: "rename",
        description: "Rename with a .bak suffix and delete later",
    },
];

const RMDIR: &[Alternative] = &[
    Alternative {
        id: "trash",
        description: "Move the directory to trash",
    },
    Alternative {
        id: "archive",
        description: "Archive the directory before removing it",
    },
    Alternative {
        id: "empty_first",
        description: "Remove the contents and keep the directory",
    },
];

const WRITE: &[Alternative] = &[
    Alternative {
        id: "backup_then_write",
        description: "Back up the file before overwriting it",
    },
    Alternative {
        id: "write_new",
        description: "Write to a new file and compare before replacing",
    },
];

const MOVE: &[Alternative] = &[
    Alternative {
        id: "copy",
        description: "Copy instead of moving, then remove the source later",
    },
    Alternative {
        id: "backup_destination",
        description: "Back up anything at the destination first",
    },
];

const CHMOD: &[Alternative] = &[
    Alternative {
        id: "single_file",
        description: "Change one file first and check the result",
    },
    Alternative {
        id: "record_modes",
        description: "Record the current modes so they can be restored",
    },
];

const CHOWN: &[Alternative] = &[
    Alternative {
        id: "chgrp",
        description: "Change the group instead of the owner",
    },
    Alternative {
        id: "record_owners",
        description: "Record the current owners so they can be restored",
    },
];

const EXECUTE: &[Alternative] = &[Alternative {
    id: "inspect",
    description: "Inspect the program before running it",
}];

const DRY_RUN: &[Alternative] = &[Alternative {
    id: "dry_run",
    description: "Run a dry run to see what would change",
}];

pub fn alternatives_for(operation: FileOperation) -> &'static [Alternative] {
    match operation {
        FileOperation::Delete => DELETE,
        FileOperation::Rmdir => RMDIR,
        FileOperation::Write => WRITE,
        FileOperation::Move => MOVE,
        FileOperation::Chmod => CHMOD,
        FileOperation::Chown => CHOWN,
        FileOperation::Execute => EXECUTE,
        FileOperation::Read
        | FileOperation::List
        | FileOperation::Stat
        | FileOperation::Create
        | FileOperation::Copy
        | FileOperation::Mkdir => DRY_RUN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_has_an_alternative() {
        for operation in FileOperation::ALL {
            assert!(!alternatives_for(operation).is_empty(), "{operation}");
        }
        assert_eq!(alternatives_for(FileOperation::Delete)[0].id, "trash");
    }

    #[test]
    fn read_only_operations_share_the_dry_run_table() {
        let read = alternatives_for(FileOperation::Read);
        assert_eq!(read, alternatives_for(FileOperation::Mkdir));
        assert_eq!(read[0].id, "dry_run");
    }
}
